//! Configuration data model.
//!
//! [`Config`] mirrors the TOML file; [`ClientConfig`] is the resolved form the
//! library consumes.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{ConsumerCredentials, Domain, Endpoints, DEFAULT_CONSUMER_URL};

use super::defaults::{
    DEFAULT_BURST, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS, DEFAULT_MAX_RETRIES,
    DEFAULT_REQUESTS_PER_MINUTE, DEFAULT_TIMEOUT_SECS,
};

/// File-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub domain: Domain,
    /// Where the CLI keeps its session file.
    pub session_path: Option<PathBuf>,
    pub timeout_secs: u64,
    pub endpoints: EndpointsConfig,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub consumer: ConsumerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: Domain::default(),
            session_path: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            endpoints: EndpointsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            consumer: ConsumerConfig::default(),
        }
    }
}

/// Optional base URL overrides, mostly for pointing at a local mock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub sso_base: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            burst: DEFAULT_BURST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

/// OAuth consumer source: explicit key/secret, or a document URL.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub key: Option<String>,
    pub secret: Option<String>,
    pub url: String,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            key: None,
            secret: None,
            url: DEFAULT_CONSUMER_URL.to_string(),
        }
    }
}

impl fmt::Debug for ConsumerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerConfig")
            .field("key", &self.key)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("url", &self.url)
            .finish()
    }
}

/// Resolved settings for [`crate::api::Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Domain for new logins.
    pub domain: Domain,
    /// Explicit base URLs pinned for every domain; `None` follows the domain.
    pub endpoints: Option<Endpoints>,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    /// Per-request timeout for both the login flow and API calls.
    pub timeout: Duration,
    /// Fixed consumer credentials; fetched from `consumer_url` when absent.
    pub consumer: Option<ConsumerCredentials>,
    pub consumer_url: String,
}

impl ClientConfig {
    /// Defaults pointed at the production endpoints of `domain`.
    pub fn for_domain(domain: Domain) -> Self {
        Self {
            domain,
            endpoints: None,
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            consumer: None,
            consumer_url: DEFAULT_CONSUMER_URL.to_string(),
        }
    }

    /// Endpoints for traffic on behalf of `domain`: the pinned override when
    /// configured, else that domain's production hosts.
    pub fn endpoints_for(&self, domain: Domain) -> Endpoints {
        match &self.endpoints {
            Some(pinned) => pinned.clone(),
            None => Endpoints::for_domain(domain),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_domain(Domain::default())
    }
}
