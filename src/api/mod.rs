//! Authenticated access to the Connect API.
//!
//! - `client`: the [`Client`] facade plus its transport and retry layers
//! - `rate_limit`: token bucket gating every outbound request
//! - `policy`: which outcomes are retried

mod client;
mod policy;
mod rate_limit;

pub use client::{Backoff, Client, HttpSend, RetryPolicy, RetryingTransport};
pub use rate_limit::RateLimiter;
