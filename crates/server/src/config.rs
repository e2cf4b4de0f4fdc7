use std::{env, fmt::Display, ops::RangeInclusive, str::FromStr};

use chrono::{DateTime, Duration, Timelike, Utc};
use rand::{Rng, distributions::Alphanumeric};
use tracing::{info, warn};

use crate::validation::PASSCODE_MAX;

/// Accepted `POLL_DEFAULT_EXPIRY_MINUTES`: one minute up to a year.
pub const EXPIRY_MINUTES_RANGE: RangeInclusive<i64> = 1..=525_600;
/// Accepted `POLL_PASSCODE_LENGTH`; longer codes would not fit the column.
pub const PASSCODE_LENGTH_RANGE: RangeInclusive<usize> = 1..=PASSCODE_MAX;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Base used to build absolute share links, without a trailing slash.
    pub public_base_url: String,
    pub policy: PollPolicy,
}

/// Defaults applied to polls created without an explicit expiry or passcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub default_expiry_minutes: i64,
    pub passcode_length: usize,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            default_expiry_minutes: 10,
            passcode_length: 10,
        }
    }
}

impl PollPolicy {
    /// `now` plus the default lifetime, pinned to second :59 of that minute.
    /// Saturates at the latest representable time instead of overflowing.
    pub fn default_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let expires = Duration::try_minutes(self.default_expiry_minutes)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        expires
            .with_second(59)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(expires)
    }

    pub fn generate_passcode(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.passcode_length)
            .map(char::from)
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            max_connections: 5,
            public_base_url: "http://localhost:3000".to_string(),
            policy: PollPolicy::default(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let policy = PollPolicy {
            default_expiry_minutes: try_load_in(
                &lookup,
                "POLL_DEFAULT_EXPIRY_MINUTES",
                defaults.policy.default_expiry_minutes,
                EXPIRY_MINUTES_RANGE,
            ),
            passcode_length: try_load_in(
                &lookup,
                "POLL_PASSCODE_LENGTH",
                defaults.policy.passcode_length,
                PASSCODE_LENGTH_RANGE,
            ),
        };

        Self {
            bind_addr: try_load(&lookup, "BIND_ADDR", defaults.bind_addr),
            port: try_load(&lookup, "PORT", defaults.port),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", defaults.max_connections),
            public_base_url: try_load(&lookup, "PUBLIC_BASE_URL", defaults.public_base_url)
                .trim_end_matches('/')
                .to_string(),
            policy,
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };

    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}

fn try_load_in<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    range: RangeInclusive<T>,
) -> T
where
    T: FromStr + Display + PartialOrd + Copy,
    T::Err: Display,
{
    let value = try_load(lookup, key, default);
    if range.contains(&value) {
        value
    } else {
        warn!(
            "{key} value {value} outside {}..={}, using default: {default}",
            range.start(),
            range.end()
        );
        default
    }
}
