//! Backend for QuickPoll, a small polling service.
//!
//! Polls are created with a fixed list of options and an expiry time. Votes
//! are anonymous: each one carries a fingerprint hashed from request headers
//! and a five minute time window, never the raw headers.
//!
//! # Layout
//! - [`store`]: persistence, PostgreSQL or in-memory
//! - [`fingerprint`]: voter pseudo-identity
//! - [`aggregate`]: totals, tallies and time labels for result pages
//! - [`routes`]: the HTTP API
//!
//! # Setup
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/quickpoll cargo run --bin server
//! ```
//!
//! Without `DATABASE_URL` the server keeps everything in memory.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod routes;
pub mod store;
pub mod validation;
