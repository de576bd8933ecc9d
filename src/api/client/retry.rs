//! Retry policy and the rate-limited, retrying transport.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::transport::HttpSend;
use crate::api::policy::{self, Disposition};
use crate::api::rate_limit::RateLimiter;
use crate::config::RetryConfig;
use crate::error::ApiError;

/// Largest jitter added on top of the exponential delay, as a fraction of it.
const MAX_JITTER_FRACTION: f64 = 0.25;

/// Bounded retry policy used by the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial request.
    pub max_retries: u32,
    /// Base delay used for exponential backoff.
    pub initial_backoff: Duration,
    /// Maximum allowed delay between retry attempts, before jitter.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Total attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// `initial * 2^attempt`, capped at `max_backoff`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let pow = 2u32.saturating_pow(attempt);
        let millis = self
            .initial_backoff
            .as_millis()
            .saturating_mul(pow as u128)
            .min(self.max_backoff.as_millis());
        Duration::from_millis(millis as u64)
    }
}

/// Backoff schedule: policy delay plus up to 25% jitter.
pub struct Backoff {
    policy: RetryPolicy,
    jitter: Box<dyn Fn() -> f64 + Send + Sync>,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_jitter(policy, rand::random::<f64>)
    }

    /// Use a custom jitter source returning a fraction in `[0, 1)`.
    pub fn with_jitter(policy: RetryPolicy, jitter: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        Self {
            policy,
            jitter: Box::new(jitter),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Delay before the retry that follows attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.policy.base_delay(attempt);
        let fraction = (self.jitter)().clamp(0.0, 1.0);
        base + base.mul_f64(MAX_JITTER_FRACTION * fraction)
    }
}

impl std::fmt::Debug for Backoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backoff")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Rate-limited transport that retries transient failures.
///
/// Each attempt first takes a limiter token. Network errors, 429, and 5xx
/// are retried with backoff; every other outcome is returned as-is, so
/// callers see 2xx and non-retryable 4xx responses untouched.
pub struct RetryingTransport {
    http: Arc<dyn HttpSend>,
    limiter: Arc<RateLimiter>,
    backoff: Backoff,
}

impl RetryingTransport {
    pub fn new(http: Arc<dyn HttpSend>, limiter: Arc<RateLimiter>, backoff: Backoff) -> Self {
        Self {
            http,
            limiter,
            backoff,
        }
    }

    /// Send `request`, retrying up to `max_retries` times.
    ///
    /// Requests whose body cannot be cloned get exactly one attempt. On
    /// exhaustion the last observed error is returned.
    pub async fn send(
        &self,
        request: reqwest::Request,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, ApiError> {
        let endpoint = request.url().path().to_string();
        let max_attempts = self.backoff.policy().max_attempts();
        let mut pending = Some(request);
        let mut last_error: Option<ApiError> = None;
        let mut attempt: u32 = 0;

        while let Some(current) = pending.take() {
            let retry_copy = if attempt + 1 < max_attempts {
                current.try_clone()
            } else {
                None
            };
            let can_retry = retry_copy.is_some();
            pending = retry_copy;

            self.limiter.acquire(cancel).await?;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                outcome = self.http.send(current) => outcome,
            };

            if policy::classify(&outcome) == Disposition::Return {
                debug!(
                    %endpoint,
                    attempt = attempt + 1,
                    status = outcome.as_ref().ok().map(|r| r.status().as_u16()),
                    "request finished"
                );
                return outcome.map_err(ApiError::from);
            }

            let (err, retry_after) = match outcome {
                Ok(response) => {
                    let code = response.status().as_u16();
                    let retry_after = retry_after(&response);
                    let body = drain(response, cancel).await?;
                    (ApiError::status(code, endpoint.as_str(), body), retry_after)
                }
                Err(err) => (ApiError::Http(err), None),
            };

            if !can_retry {
                warn!(%endpoint, attempt = attempt + 1, error = %err, "giving up on request");
                last_error = Some(err);
                break;
            }

            let mut delay = self.backoff.delay_for(attempt);
            if let Some(hint) = retry_after {
                delay = delay.max(hint.min(self.backoff.policy().max_backoff));
            }
            warn!(
                %endpoint,
                attempt = attempt + 1,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying request"
            );
            last_error = Some(err);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::MaxRetriesExceeded))
    }
}

/// `Retry-After` in whole seconds, when present.
fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Read the rest of a body we are about to discard, keeping it for errors.
async fn drain(response: reqwest::Response, cancel: &CancellationToken) -> Result<String, ApiError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
        body = response.text() => Ok(body.unwrap_or_else(|err| {
            debug!(error = %err, "failed to read discarded response body");
            String::new()
        })),
    }
}
