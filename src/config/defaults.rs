//! Built-in configuration defaults.

pub(crate) const DEFAULT_REQUESTS_PER_MINUTE: u32 = 15;
pub(crate) const DEFAULT_BURST: u32 = 5;
pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;
pub(crate) const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1_000;
pub(crate) const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Config file name looked up locally and under the global config root.
pub(crate) const CONFIG_FILE_NAME: &str = "gconnect.toml";
/// Directory under the config root that holds config and session files.
pub(crate) const APP_DIR_NAME: &str = "gconnect";
