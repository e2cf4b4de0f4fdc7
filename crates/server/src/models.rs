use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::OptionTally;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Poll {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub passcode: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PollOption {
    pub id: i64,
    pub poll_id: Uuid,
    pub text: String,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: i64,
    pub poll_id: Uuid,
    pub poll_option_id: i64,
    pub voter_identifier: String,
    pub created_at: DateTime<Utc>,
}

/// A poll together with its options and every vote cast on it.
#[derive(Debug, Clone, Serialize)]
pub struct PollDetail {
    #[serde(flatten)]
    pub poll: Poll,
    pub poll_options: Vec<PollOption>,
    pub votes: Vec<Vote>,
}

/// Validated input for creating a poll. Missing expiry and passcode are
/// filled in by the store from the configured [`crate::config::PollPolicy`].
#[derive(Debug, Clone)]
pub struct NewPoll {
    pub title: String,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub options: Vec<String>,
    pub passcode: Option<String>,
}

// ===== Request bodies =====

#[derive(Debug, Default)]
pub struct CreatePollRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub expires_at: Option<String>,
    pub options: Option<Vec<String>>,
    pub passcode: Option<String>,
}

#[derive(Debug, Default)]
pub struct VoteRequest {
    pub poll_option_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCompleteQuery {
    pub voter_identifier: Option<String>,
}

// ===== Response bodies =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollResponse {
    pub message: String,
    pub poll_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub message: String,
    pub vote_complete_url: String,
    pub voter_identifier: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResultsResponse {
    #[serde(flatten)]
    pub poll: PollDetail,
    pub total_votes: usize,
    pub last_vote_label: String,
    pub remaining_label: String,
    pub is_expired: bool,
    pub results: Vec<OptionTally>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollCompleteResponse {
    pub poll: PollDetail,
    pub share_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCompleteResponse {
    pub poll: PollDetail,
    pub voter_identifier: Option<String>,
    pub total_votes: usize,
    pub last_vote_label: String,
}
