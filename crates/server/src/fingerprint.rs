//! Voter pseudo-identity derived from request headers.
//!
//! The fingerprint is a SHA-256 over a handful of request signals and a
//! five minute time bucket. It approximates "the same browser, right now"
//! without storing any of the raw signals; collisions and false
//! distinctions are both expected.

use std::net::IpAddr;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

/// Width of a fingerprint time window, in seconds.
pub const BUCKET_SECONDS: i64 = 300;

const DELIMITER: &str = "|";

/// Request-derived inputs to the voter fingerprint. Absent values are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoterSignals {
    pub address: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub ua: String,
    pub ua_platform: String,
    pub ua_mobile: String,
}

impl VoterSignals {
    /// Collects signals from request headers. The client address comes from
    /// `x-forwarded-for`, then `cf-connecting-ip`, then the socket peer.
    pub fn from_headers(headers: &HeaderMap, peer: Option<IpAddr>) -> Self {
        let address = header(headers, "x-forwarded-for")
            .or_else(|| header(headers, "cf-connecting-ip"))
            .or_else(|| peer.map(|ip| ip.to_string()))
            .unwrap_or_default();

        Self {
            address,
            accept_language: header(headers, "accept-language").unwrap_or_default(),
            accept_encoding: header(headers, "accept-encoding").unwrap_or_default(),
            ua: header(headers, "sec-ch-ua").unwrap_or_default(),
            ua_platform: header(headers, "sec-ch-ua-platform").unwrap_or_default(),
            ua_mobile: header(headers, "sec-ch-ua-mobile").unwrap_or_default(),
        }
    }

    /// Lowercase hex SHA-256 of the signals and the time bucket of `now`.
    pub fn fingerprint(&self, now: DateTime<Utc>) -> String {
        let bucket = time_bucket(now).to_string();
        let components = [
            self.address.as_str(),
            self.accept_language.as_str(),
            self.accept_encoding.as_str(),
            self.ua.as_str(),
            self.ua_platform.as_str(),
            self.ua_mobile.as_str(),
            bucket.as_str(),
        ]
        .join(DELIMITER);

        sha256::digest(components)
    }
}

pub fn time_bucket(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(BUCKET_SECONDS)
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}
