//! HTTP send seam and client construction.

use std::time::Duration;

use async_trait::async_trait;

/// Minimal HTTP interface used by the retrying transport.
///
/// Production code uses `reqwest::Client`; tests wrap it to count or
/// observe outbound requests.
#[async_trait]
pub trait HttpSend: Send + Sync {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error>;
}

#[async_trait]
impl HttpSend for reqwest::Client {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        self.execute(request).await
    }
}

/// Build an HTTP client with timeout applied.
pub(crate) fn build_http_client(timeout: Duration) -> reqwest::Client {
    // Fall back to reqwest defaults if builder creation fails for any reason.
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
