//! Persistence for polls, options and votes.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::PollPolicy,
    models::{NewPoll, PollDetail, PollOption, Vote},
};

pub use memory::MemoryPollStore;
pub use postgres::PgPollStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Poll not found")]
    PollNotFound,

    #[error("Option {option_id} does not belong to poll {poll_id}")]
    OptionNotInPoll { poll_id: Uuid, option_id: i64 },

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Storage backend for polls.
///
/// Creating a poll writes the poll and all of its options as one unit: if
/// any row fails, nothing is visible afterwards.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Persists a poll with its options and returns the new poll id.
    async fn create_poll_with_options(&self, poll: NewPoll) -> Result<Uuid, StoreError>;

    /// Poll with options (display order) and votes, or `None` if unknown.
    async fn get_poll(&self, id: Uuid) -> Result<Option<PollDetail>, StoreError>;

    /// Options in display order; empty when the poll does not exist.
    async fn get_options(&self, id: Uuid) -> Result<Vec<PollOption>, StoreError>;

    /// Appends a vote. The option must belong to the poll.
    async fn record_vote(
        &self,
        poll_id: Uuid,
        option_id: i64,
        voter_identifier: &str,
    ) -> Result<Vote, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// A [`NewPoll`] with every default filled in, ready to be written.
#[derive(Debug, Clone)]
pub(crate) struct PollRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub passcode: String,
    pub options: Vec<String>,
}

impl PollRecord {
    pub(crate) fn resolve(poll: NewPoll, policy: &PollPolicy, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: poll.title,
            description: poll.description,
            expires_at: poll
                .expires_at
                .unwrap_or_else(|| policy.default_expiry(now)),
            passcode: poll
                .passcode
                .unwrap_or_else(|| policy.generate_passcode()),
            options: poll.options,
        }
    }
}
