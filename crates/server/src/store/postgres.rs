use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction, postgres::PgPoolOptions};
use tracing::instrument;
use uuid::Uuid;

use super::{PollRecord, PollStore, StoreError};
use crate::{
    config::PollPolicy,
    models::{NewPoll, Poll, PollDetail, PollOption, Vote},
};

const POLL_COLUMNS: &str =
    "id, title, description, expires_at, passcode, created_at, updated_at";
const OPTION_COLUMNS: &str = "id, poll_id, text, sort_order, created_at, updated_at";
const VOTE_COLUMNS: &str = "id, poll_id, poll_option_id, voter_identifier, created_at";

#[derive(Debug, Clone)]
pub struct PgPollStore {
    db: PgPool,
    policy: PollPolicy,
}

impl PgPollStore {
    pub fn new(db: PgPool, policy: PollPolicy) -> Self {
        Self { db, policy }
    }

    /// Connects and applies pending migrations.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        policy: PollPolicy,
    ) -> Result<Self, StoreError> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;

        Ok(Self::new(db, policy))
    }

    /// Read transaction whose statements all see one snapshot.
    async fn begin_snapshot(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        let mut tx = self.db.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

#[async_trait]
impl PollStore for PgPollStore {
    #[instrument(skip(self, poll), fields(options = poll.options.len()))]
    async fn create_poll_with_options(&self, poll: NewPoll) -> Result<Uuid, StoreError> {
        let record = PollRecord::resolve(poll, &self.policy, Utc::now());

        // Dropping the transaction on an early return rolls it back.
        let mut tx = self.db.begin().await?;

        sqlx::query(
            "INSERT INTO polls (id, title, description, expires_at, passcode)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.expires_at)
        .bind(&record.passcode)
        .execute(&mut *tx)
        .await?;

        for (order, text) in record.options.iter().enumerate() {
            sqlx::query("INSERT INTO poll_options (poll_id, text, sort_order) VALUES ($1, $2, $3)")
                .bind(record.id)
                .bind(text)
                .bind(order as i32)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(record.id)
    }

    async fn get_poll(&self, id: Uuid) -> Result<Option<PollDetail>, StoreError> {
        let mut tx = self.begin_snapshot().await?;

        let poll: Option<Poll> =
            sqlx::query_as(&format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = $1"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(poll) = poll else {
            return Ok(None);
        };

        let poll_options: Vec<PollOption> = sqlx::query_as(&format!(
            "SELECT {OPTION_COLUMNS} FROM poll_options WHERE poll_id = $1 ORDER BY sort_order, id"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let votes: Vec<Vote> = sqlx::query_as(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE poll_id = $1 ORDER BY created_at, id"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(PollDetail {
            poll,
            poll_options,
            votes,
        }))
    }

    async fn get_options(&self, id: Uuid) -> Result<Vec<PollOption>, StoreError> {
        let options = sqlx::query_as(&format!(
            "SELECT {OPTION_COLUMNS} FROM poll_options WHERE poll_id = $1 ORDER BY sort_order, id"
        ))
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(options)
    }

    #[instrument(skip(self, voter_identifier))]
    async fn record_vote(
        &self,
        poll_id: Uuid,
        option_id: i64,
        voter_identifier: &str,
    ) -> Result<Vote, StoreError> {
        // Inserts only when the option belongs to the poll.
        let vote: Option<Vote> = sqlx::query_as(&format!(
            "INSERT INTO votes (poll_id, poll_option_id, voter_identifier)
             SELECT o.poll_id, o.id, $3 FROM poll_options o
             WHERE o.id = $2 AND o.poll_id = $1
             RETURNING {VOTE_COLUMNS}"
        ))
        .bind(poll_id)
        .bind(option_id)
        .bind(voter_identifier)
        .fetch_optional(&self.db)
        .await?;

        if let Some(vote) = vote {
            return Ok(vote);
        }

        let poll_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM polls WHERE id = $1)")
            .bind(poll_id)
            .fetch_one(&self.db)
            .await?;

        if poll_exists {
            Err(StoreError::OptionNotInPoll { poll_id, option_id })
        } else {
            Err(StoreError::PollNotFound)
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
