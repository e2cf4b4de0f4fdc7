//! Derived, view-ready figures for a poll: vote totals, per-option tallies,
//! a relative "last vote" label and the expiry countdown.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{PollDetail, PollOption, Vote};

pub const NOT_YET_VOTED: &str = "not yet voted";
pub const JUST_NOW: &str = "just now";
pub const ENDED: &str = "ended";

const MS_PER_MINUTE: i64 = 60_000;

/// An option annotated with the votes cast for it.
#[derive(Debug, Clone, Serialize)]
pub struct OptionTally {
    #[serde(flatten)]
    pub option: PollOption,
    pub vote_count: usize,
    pub votes: Vec<Vote>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remaining {
    pub label: String,
    pub is_expired: bool,
}

#[derive(Debug, Clone)]
pub struct PollSummary {
    pub total_votes: usize,
    pub latest_vote: Option<Vote>,
    pub last_vote_label: String,
    pub remaining: Remaining,
    pub tallies: Vec<OptionTally>,
}

pub fn summarize(detail: &PollDetail, now: DateTime<Utc>) -> PollSummary {
    let latest = latest_vote(&detail.votes);

    PollSummary {
        total_votes: detail.votes.len(),
        last_vote_label: last_vote_label(latest, now),
        latest_vote: latest.cloned(),
        remaining: remaining(detail.poll.expires_at, now),
        tallies: group_votes(&detail.poll_options, &detail.votes),
    }
}

/// The vote with the greatest `created_at`. Ties keep the first one seen.
pub fn latest_vote(votes: &[Vote]) -> Option<&Vote> {
    votes.iter().fold(None, |latest, vote| match latest {
        Some(current) if vote.created_at <= current.created_at => Some(current),
        _ => Some(vote),
    })
}

pub fn last_vote_label(latest: Option<&Vote>, now: DateTime<Utc>) -> String {
    match latest {
        Some(vote) => relative_label(vote.created_at, now),
        None => NOT_YET_VOTED.to_string(),
    }
}

/// Human-readable age of `then` relative to `now`, floored to whole units.
pub fn relative_label(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = whole_minutes(now - then);
    if minutes < 1 {
        return JUST_NOW.to_string();
    }
    if minutes < 60 {
        return format!("{minutes} minutes ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours} hours ago");
    }
    format!("{} days ago", hours / 24)
}

pub fn remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Remaining {
    let minutes = whole_minutes(expires_at - now);
    if minutes < 0 {
        Remaining {
            label: ENDED.to_string(),
            is_expired: true,
        }
    } else {
        Remaining {
            label: format!("{minutes} minutes"),
            is_expired: false,
        }
    }
}

/// Groups votes under their option, keeping option order. Votes whose
/// option is not listed are left out of every group.
pub fn group_votes(options: &[PollOption], votes: &[Vote]) -> Vec<OptionTally> {
    options
        .iter()
        .map(|option| {
            let votes: Vec<Vote> = votes
                .iter()
                .filter(|vote| vote.poll_option_id == option.id)
                .cloned()
                .collect();
            OptionTally {
                option: option.clone(),
                vote_count: votes.len(),
                votes,
            }
        })
        .collect()
}

// Floor division, so one millisecond past expiry is already -1.
fn whole_minutes(delta: chrono::Duration) -> i64 {
    delta.num_milliseconds().div_euclid(MS_PER_MINUTE)
}
