//! Token-bucket rate limiter shared by every outbound API request.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ApiError;

/// Shortest sleep between refill checks; keeps float rounding from spinning.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Slack when comparing fractional token counts against one whole token.
const TOKEN_EPSILON: f64 = 1e-9;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with fractional refill.
///
/// Refills continuously at `requests_per_minute / 60` tokens per second up to
/// `burst` tokens. The bucket starts full. Waiters are not served in FIFO
/// order.
pub struct RateLimiter {
    capacity: f64,
    per_second: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter; zero values are clamped to one.
    pub fn new(requests_per_minute: u32, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            capacity,
            per_second: f64::from(requests_per_minute.max(1)) / 60.0,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Wait for a token, or fail with [`ApiError::Cancelled`].
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), ApiError> {
        loop {
            if cancel.is_cancelled() {
                return Err(ApiError::Cancelled);
            }
            let wait = {
                let mut bucket = self.bucket.lock().await;
                match self.take(&mut bucket) {
                    None => return Ok(()),
                    Some(wait) => wait,
                }
            };
            debug!(wait_ms = wait.as_millis() as u64, "rate limiter waiting");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Take a token without waiting; [`ApiError::RateLimited`] when empty.
    pub async fn try_acquire(&self) -> Result<(), ApiError> {
        let mut bucket = self.bucket.lock().await;
        match self.take(&mut bucket) {
            None => Ok(()),
            Some(_) => Err(ApiError::RateLimited),
        }
    }

    /// Tokens currently available, after refill.
    pub async fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        self.refill(&mut bucket, Instant::now());
        bucket.tokens
    }

    /// Refill once, then consume a token (`None`) or report the wait for the
    /// next one.
    fn take(&self, bucket: &mut Bucket) -> Option<Duration> {
        self.refill(bucket, Instant::now());
        if bucket.tokens + TOKEN_EPSILON >= 1.0 {
            bucket.tokens = (bucket.tokens - 1.0).max(0.0);
            return None;
        }
        let deficit = 1.0 - bucket.tokens;
        Some(Duration::from_secs_f64(deficit / self.per_second).max(MIN_WAIT))
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.per_second).min(self.capacity);
        bucket.last_refill = now;
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("capacity", &self.capacity)
            .field("per_second", &self.per_second)
            .finish_non_exhaustive()
    }
}
