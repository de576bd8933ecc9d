//! Environment variable overrides.
//!
//! `GCONNECT_*` variables win over every file source.

use std::path::PathBuf;
use std::str::FromStr;

use crate::auth::Domain;
use crate::error::ConfigError;

use super::Config;

pub(super) const ENV_DOMAIN: &str = "GCONNECT_DOMAIN";
pub(super) const ENV_REQUESTS_PER_MINUTE: &str = "GCONNECT_REQUESTS_PER_MINUTE";
pub(super) const ENV_BURST: &str = "GCONNECT_BURST";
pub(super) const ENV_MAX_RETRIES: &str = "GCONNECT_MAX_RETRIES";
pub(super) const ENV_TIMEOUT_SECS: &str = "GCONNECT_TIMEOUT_SECS";
pub(super) const ENV_SESSION_PATH: &str = "GCONNECT_SESSION_PATH";

pub(super) fn apply_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(domain) = non_empty(env_lookup, ENV_DOMAIN) {
        config.domain = Domain::from_str(&domain)
            .map_err(|err| ConfigError::Invalid(format!("{ENV_DOMAIN}: {err}")))?;
    }
    if let Some(value) = non_empty(env_lookup, ENV_REQUESTS_PER_MINUTE) {
        config.rate_limit.requests_per_minute = parse_positive(ENV_REQUESTS_PER_MINUTE, &value)?;
    }
    if let Some(value) = non_empty(env_lookup, ENV_BURST) {
        config.rate_limit.burst = parse_positive(ENV_BURST, &value)?;
    }
    if let Some(value) = non_empty(env_lookup, ENV_MAX_RETRIES) {
        config.retry.max_retries = value.parse::<u32>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid {ENV_MAX_RETRIES} value `{value}`: expected a non-negative integer"
            ))
        })?;
    }
    if let Some(value) = non_empty(env_lookup, ENV_TIMEOUT_SECS) {
        config.timeout_secs = u64::from(parse_positive(ENV_TIMEOUT_SECS, &value)?);
    }
    if let Some(path) = non_empty(env_lookup, ENV_SESSION_PATH) {
        config.session_path = Some(PathBuf::from(path));
    }
    Ok(())
}

fn non_empty<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_positive(name: &str, value: &str) -> Result<u32, ConfigError> {
    match value.parse::<u32>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::Invalid(format!(
            "invalid {name} value `{value}`: expected a positive integer"
        ))),
    }
}
