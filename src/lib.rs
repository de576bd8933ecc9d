//! gconnect — an authenticated client for the Garmin Connect API.
//!
//! Logging in scripts the SSO web portal (cookies, CSRF, credentials, and an
//! optional MFA step), redeems the resulting ticket for an OAuth1 token, and
//! trades that for an OAuth2 bearer. API calls then flow through a shared
//! token-bucket rate limiter and a retrying transport.
//!
//! # Quick start
//!
//! ```no_run
//! use gconnect::api::Client;
//! use gconnect::config::ClientConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), gconnect::Error> {
//! let client = Client::new(ClientConfig::default());
//! let cancel = CancellationToken::new();
//! client.login("me@example.com", "hunter2", None, &cancel).await?;
//! let profile: serde_json::Value = client
//!     .get_json("/userprofile-service/socialProfile", &cancel)
//!     .await?;
//! println!("{profile}");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
#[cfg(test)]
pub mod testsupport;

pub use error::Error;
