use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct PollOption {
    pub id: i64,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CreatePollRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passcode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollResponse {
    pub poll_id: String,
}

#[derive(Debug, Serialize)]
pub struct VoteRequest {
    pub poll_option_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub voter_identifier: String,
}

#[derive(Debug, Deserialize)]
pub struct OptionResult {
    pub text: String,
    pub vote_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub title: String,
    pub total_votes: usize,
    pub last_vote_label: String,
    pub remaining_label: String,
    pub is_expired: bool,
    pub results: Vec<OptionResult>,
}
