//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`GCONNECT_DOMAIN`, `GCONNECT_REQUESTS_PER_MINUTE`,
//!    `GCONNECT_BURST`, `GCONNECT_MAX_RETRIES`, `GCONNECT_TIMEOUT_SECS`,
//!    `GCONNECT_SESSION_PATH`)
//! 2. TOML file specified via `--config`
//! 3. `./gconnect.toml` in the current directory
//! 4. `$XDG_CONFIG_HOME/gconnect/gconnect.toml` (or `~/.config/gconnect/gconnect.toml`)
//! 5. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{ConsumerCredentials, Endpoints};
use crate::error::ConfigError;

mod defaults;
mod env;
mod loader;
mod sources;
mod types;

pub use loader::{load_config, load_config_with_source, LoadedConfig};
pub use sources::ConfigSource;
pub use types::{
    ClientConfig, Config, ConsumerConfig, EndpointsConfig, RateLimitConfig, RetryConfig,
};

/// Root directory for user config files: `$XDG_CONFIG_HOME`, else `~/.config`.
pub fn config_root_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .or_else(dirs::config_dir)
}

impl Config {
    /// Resolve file settings into the form [`crate::api::Client`] consumes.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let defaults = Endpoints::for_domain(self.domain);
        let endpoints = match (&self.endpoints.sso_base, &self.endpoints.api_base) {
            (None, None) => None,
            (sso, api) => Some(
                Endpoints::with_bases(
                    sso.as_deref().unwrap_or(defaults.sso_base()),
                    api.as_deref().unwrap_or(defaults.api_base()),
                )
                .map_err(|err| ConfigError::Invalid(format!("endpoint override: {err}")))?,
            ),
        };

        let consumer = match (&self.consumer.key, &self.consumer.secret) {
            (Some(key), Some(secret)) => Some(ConsumerCredentials {
                consumer_key: key.clone(),
                consumer_secret: secret.clone(),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid(
                    "consumer.key and consumer.secret must be set together".to_string(),
                ))
            }
        };

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.initial_backoff_ms must not exceed retry.max_backoff_ms".to_string(),
            ));
        }

        Ok(ClientConfig {
            domain: self.domain,
            endpoints,
            rate_limit: self.rate_limit,
            retry: self.retry,
            // Zero would disable the timeout entirely.
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            consumer,
            consumer_url: self.consumer.url.clone(),
        })
    }

    /// Session file location: configured path, else the default under the
    /// config root.
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_path
            .clone()
            .or_else(crate::auth::default_session_path)
    }
}
