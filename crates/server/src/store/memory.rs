use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use super::{PollRecord, PollStore, StoreError};
use crate::{
    config::PollPolicy,
    models::{NewPoll, Poll, PollDetail, PollOption, Vote},
    validation::{DESCRIPTION_MAX, PASSCODE_MAX, TITLE_MAX},
};

/// In-process [`PollStore`] backed by `RwLock`ed tables.
///
/// Used when no database is configured and in tests. It enforces the same
/// column constraints as the SQL schema, and checks a whole poll before
/// writing any of it, so a rejected option never leaves a poll behind.
#[derive(Debug, Default)]
pub struct MemoryPollStore {
    policy: PollPolicy,
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    polls: HashMap<Uuid, Poll>,
    options: Vec<PollOption>,
    votes: Vec<Vote>,
    next_option_id: i64,
    next_vote_id: i64,
}

impl MemoryPollStore {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            tables: RwLock::default(),
        }
    }
}

impl Tables {
    fn options_of(&self, poll_id: Uuid) -> Vec<PollOption> {
        let mut options: Vec<PollOption> = self
            .options
            .iter()
            .filter(|o| o.poll_id == poll_id)
            .cloned()
            .collect();
        options.sort_by_key(|o| (o.sort_order, o.id));
        options
    }
}

fn check_constraints(record: &PollRecord) -> Result<(), StoreError> {
    let title_len = record.title.chars().count();
    if title_len == 0 || title_len > TITLE_MAX {
        return Err(StoreError::Constraint("polls.title length".into()));
    }
    if record
        .description
        .as_ref()
        .is_some_and(|d| d.chars().count() > DESCRIPTION_MAX)
    {
        return Err(StoreError::Constraint("polls.description length".into()));
    }
    if record.passcode.chars().count() > PASSCODE_MAX {
        return Err(StoreError::Constraint("polls.passcode length".into()));
    }
    if record.options.iter().any(String::is_empty) {
        return Err(StoreError::Constraint("poll_options.text must not be empty".into()));
    }
    Ok(())
}

#[async_trait]
impl PollStore for MemoryPollStore {
    #[instrument(skip(self, poll), fields(options = poll.options.len()))]
    async fn create_poll_with_options(&self, poll: NewPoll) -> Result<Uuid, StoreError> {
        let now = Utc::now();
        let record = PollRecord::resolve(poll, &self.policy, now);
        check_constraints(&record)?;

        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;

        for (order, text) in record.options.iter().enumerate() {
            tables.next_option_id += 1;
            let option = PollOption {
                id: tables.next_option_id,
                poll_id: record.id,
                text: text.clone(),
                sort_order: order as i32,
                created_at: now,
                updated_at: now,
            };
            tables.options.push(option);
        }

        tables.polls.insert(
            record.id,
            Poll {
                id: record.id,
                title: record.title,
                description: record.description,
                expires_at: record.expires_at,
                passcode: record.passcode,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(record.id)
    }

    async fn get_poll(&self, id: Uuid) -> Result<Option<PollDetail>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;

        let Some(poll) = tables.polls.get(&id).cloned() else {
            return Ok(None);
        };

        let votes = tables
            .votes
            .iter()
            .filter(|v| v.poll_id == id)
            .cloned()
            .collect();

        Ok(Some(PollDetail {
            poll,
            poll_options: tables.options_of(id),
            votes,
        }))
    }

    async fn get_options(&self, id: Uuid) -> Result<Vec<PollOption>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.options_of(id))
    }

    #[instrument(skip(self, voter_identifier))]
    async fn record_vote(
        &self,
        poll_id: Uuid,
        option_id: i64,
        voter_identifier: &str,
    ) -> Result<Vote, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;

        if !tables.polls.contains_key(&poll_id) {
            return Err(StoreError::PollNotFound);
        }
        if !tables
            .options
            .iter()
            .any(|o| o.id == option_id && o.poll_id == poll_id)
        {
            return Err(StoreError::OptionNotInPoll { poll_id, option_id });
        }

        tables.next_vote_id += 1;
        let vote = Vote {
            id: tables.next_vote_id,
            poll_id,
            poll_option_id: option_id,
            voter_identifier: voter_identifier.to_string(),
            created_at: Utc::now(),
        };
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.tables
            .read()
            .map(|_| ())
            .map_err(|_| StoreError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn new_poll(options: &[&str]) -> NewPoll {
        NewPoll {
            title: "Lunch?".into(),
            description: Some("Pick one".into()),
            expires_at: None,
            options: options.iter().map(|o| o.to_string()).collect(),
            passcode: None,
        }
    }

    #[tokio::test]
    async fn creates_poll_with_ordered_options() {
        let store = MemoryPollStore::default();
        let id = store.create_poll_with_options(new_poll(&["A", "B", "C"])).await.unwrap();

        let detail = store.get_poll(id).await.unwrap().unwrap();
        assert_eq!(detail.poll.title, "Lunch?");
        let options: Vec<(&str, i32)> = detail
            .poll_options
            .iter()
            .map(|o| (o.text.as_str(), o.sort_order))
            .collect();
        assert_eq!(options, [("A", 0), ("B", 1), ("C", 2)]);
        assert!(detail.votes.is_empty());
    }

    #[tokio::test]
    async fn applies_policy_defaults() {
        let policy = PollPolicy {
            default_expiry_minutes: 10,
            passcode_length: 8,
        };
        let store = MemoryPollStore::new(policy);
        let before = Utc::now();
        let id = store.create_poll_with_options(new_poll(&["A", "B"])).await.unwrap();

        let poll = store.get_poll(id).await.unwrap().unwrap().poll;
        assert_eq!(poll.passcode.len(), 8);
        assert!(poll.expires_at > before + Duration::minutes(9));
        assert!(poll.expires_at <= before + Duration::minutes(11));
        assert_eq!(poll.expires_at.timestamp() % 60, 59);
    }

    #[tokio::test]
    async fn keeps_supplied_expiry_and_passcode() {
        let store = MemoryPollStore::default();
        let expires_at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let id = store
            .create_poll_with_options(NewPoll {
                expires_at: Some(expires_at),
                passcode: Some("secret".into()),
                ..new_poll(&["A", "B"])
            })
            .await
            .unwrap();

        let poll = store.get_poll(id).await.unwrap().unwrap().poll;
        assert_eq!(poll.expires_at, expires_at);
        assert_eq!(poll.passcode, "secret");
    }

    #[tokio::test]
    async fn failed_option_leaves_no_poll() {
        let store = MemoryPollStore::default();
        let result = store.create_poll_with_options(new_poll(&["A", ""])).await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));

        let tables = store.tables.read().unwrap();
        assert!(tables.polls.is_empty());
        assert!(tables.options.is_empty());
    }

    #[tokio::test]
    async fn unknown_poll_is_none_and_has_no_options() {
        let store = MemoryPollStore::default();
        assert!(store.get_poll(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.get_options(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn vote_must_reference_option_of_same_poll() {
        let store = MemoryPollStore::default();
        let first = store.create_poll_with_options(new_poll(&["A", "B"])).await.unwrap();
        let second = store.create_poll_with_options(new_poll(&["C", "D"])).await.unwrap();
        let foreign = store.get_options(second).await.unwrap()[0].id;

        assert!(matches!(
            store.record_vote(first, foreign, "fp").await,
            Err(StoreError::OptionNotInPoll { option_id, .. }) if option_id == foreign
        ));
        assert!(matches!(
            store.record_vote(Uuid::new_v4(), foreign, "fp").await,
            Err(StoreError::PollNotFound)
        ));
    }

    #[tokio::test]
    async fn repeat_votes_are_kept() {
        let store = MemoryPollStore::default();
        let id = store.create_poll_with_options(new_poll(&["A", "B"])).await.unwrap();
        let option = store.get_options(id).await.unwrap()[1].id;

        store.record_vote(id, option, "same").await.unwrap();
        store.record_vote(id, option, "same").await.unwrap();

        let votes = store.get_poll(id).await.unwrap().unwrap().votes;
        assert_eq!(votes.len(), 2);
        assert!(votes.iter().all(|v| v.poll_option_id == option && v.voter_identifier == "same"));
    }
}
