//! Stage-tagged HTTP helpers shared by the login flow.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{AuthError, LoginStage};

/// User agent the SSO portal and OAuth service expect from the mobile app.
pub(crate) const LOGIN_USER_AGENT: &str = "com.garmin.android.apps.connectmobile";

/// Build a fresh HTTP client whose cookie jar lives only as long as one login.
pub(crate) fn login_http_client(timeout: Duration) -> Result<reqwest::Client, AuthError> {
    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(timeout)
        .user_agent(LOGIN_USER_AGENT)
        .build()
        .map_err(|err| AuthError::http(LoginStage::Priming, err))
}

/// Send one request for `stage`, racing cancellation; non-2xx is fatal.
pub(crate) async fn send(
    stage: LoginStage,
    cancel: &CancellationToken,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, AuthError> {
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AuthError::Cancelled { stage }),
        result = request.send() => result.map_err(|err| AuthError::http(stage, err))?,
    };

    let status = response.status();
    debug!(%stage, status = status.as_u16(), "login step response");
    if !status.is_success() {
        // Bodies may echo submitted form fields; never surface them.
        return Err(AuthError::Status {
            stage,
            code: status.as_u16(),
        });
    }
    Ok(response)
}

/// Read a response body as text, racing cancellation.
pub(crate) async fn text(
    stage: LoginStage,
    cancel: &CancellationToken,
    response: reqwest::Response,
) -> Result<String, AuthError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AuthError::Cancelled { stage }),
        result = response.text() => result.map_err(|err| AuthError::http(stage, err)),
    }
}

/// Send and read the body in one step.
pub(crate) async fn send_text(
    stage: LoginStage,
    cancel: &CancellationToken,
    request: reqwest::RequestBuilder,
) -> Result<String, AuthError> {
    let response = send(stage, cancel, request).await?;
    text(stage, cancel, response).await
}
