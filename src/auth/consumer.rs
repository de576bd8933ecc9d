//! OAuth consumer credential resolution.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{AuthError, LoginStage};
use super::http::send_text;
use super::oauth1::ConsumerCredentials;

/// Public document carrying the mobile app's consumer key and secret.
pub const DEFAULT_CONSUMER_URL: &str = "https://thegarth.s3.amazonaws.com/oauth_consumer.json";

/// Fetch consumer credentials from a JSON document
/// (`{"consumer_key": "...", "consumer_secret": "..."}`).
pub async fn fetch_consumer(
    http: &reqwest::Client,
    url: &str,
    cancel: &CancellationToken,
) -> Result<ConsumerCredentials, AuthError> {
    let stage = LoginStage::Consumer;
    let body = send_text(stage, cancel, http.get(url)).await?;
    let consumer: ConsumerCredentials = serde_json::from_str(&body)
        .map_err(|err| AuthError::invalid(stage, format!("consumer document: {err}")))?;
    if consumer.consumer_key.trim().is_empty() || consumer.consumer_secret.trim().is_empty() {
        return Err(AuthError::invalid(
            stage,
            "consumer document has an empty key or secret",
        ));
    }
    debug!("fetched OAuth consumer credentials");
    Ok(consumer)
}
