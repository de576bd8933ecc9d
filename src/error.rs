//! Unified error types and classifier predicates.
//!
//! Classification is a pure function over data: every predicate inspects a
//! structured status code first and falls back to sentinel variants, so the
//! same question can be asked of a raw [`ApiError`] or of the crate-level
//! [`Error`] that wraps it.

use thiserror::Error;

use crate::auth::AuthError;

/// Maximum number of body characters echoed into [`StatusError::message`].
const MESSAGE_PREVIEW_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Errors from the signed API transport.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No session is loaded, or it lacks OAuth1/OAuth2 credentials.
    #[error("not authenticated: log in or load a saved session first")]
    NotAuthenticated,
    /// The OAuth2 access token is within the expiry safety window.
    #[error("session expired: log in again")]
    SessionExpired,
    /// No rate-limit capacity is available right now.
    #[error("rate limited")]
    RateLimited,
    /// The transport gave up without capturing a concrete failure.
    #[error("max retries exceeded")]
    MaxRetriesExceeded,
    /// The resource does not exist (204/404 on a read).
    #[error("resource not found")]
    NotFound,
    /// The caller's cancellation token fired before the operation finished.
    #[error("operation cancelled")]
    Cancelled,
    /// Non-2xx status from the API.
    #[error(transparent)]
    Status(Box<StatusError>),
    /// Network / reqwest-level error.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    /// A 2xx response whose body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The request could not be built (bad path or body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Structured description of a non-2xx API response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{endpoint}: status {code} {status_text}: {message}")]
pub struct StatusError {
    pub code: u16,
    pub status_text: String,
    pub endpoint: String,
    /// Server-provided message, or a short preview of the body.
    pub message: String,
    /// Raw response body.
    pub body: String,
}

impl StatusError {
    pub fn new(code: u16, endpoint: impl Into<String>, body: String) -> Self {
        let status_text = reqwest::StatusCode::from_u16(code)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self {
            code,
            status_text,
            endpoint: endpoint.into(),
            message: extract_message(&body),
            body,
        }
    }
}

/// Pull a human-readable message out of an error body.
fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error_description", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.chars().count() > MESSAGE_PREVIEW_CHARS {
        let preview: String = trimmed.chars().take(MESSAGE_PREVIEW_CHARS).collect();
        format!("{preview}...")
    } else {
        trimmed.to_string()
    }
}

impl ApiError {
    /// Build a structured status error.
    pub fn status(code: u16, endpoint: impl Into<String>, body: String) -> Self {
        Self::Status(Box::new(StatusError::new(code, endpoint, body)))
    }

    /// HTTP status code carried by this error, when there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status(inner) => Some(inner.code),
            Self::Http(inner) => inner.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self.status_code() {
            Some(code) => code == 404,
            None => matches!(self, Self::NotFound),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        match self.status_code() {
            Some(code) => code == 429,
            None => matches!(self, Self::RateLimited),
        }
    }

    pub fn is_auth_error(&self) -> bool {
        match self.status_code() {
            Some(code) => code == 401 || code == 403,
            None => matches!(self, Self::NotAuthenticated | Self::SessionExpired),
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_some_and(is_server_status)
    }

    /// True for failures the retrying transport would try again.
    pub fn is_retryable(&self) -> bool {
        match self.status_code() {
            Some(code) => is_retryable_status(code),
            // A transport failure with no status never reached the server.
            None => matches!(self, Self::Http(_) | Self::RateLimited),
        }
    }
}

pub(crate) fn is_server_status(code: u16) -> bool {
    (500..=599).contains(&code)
}

pub(crate) fn is_retryable_status(code: u16) -> bool {
    code == 429 || is_server_status(code)
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Errors reading or writing a persisted session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed session: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Error — top-level
// ---------------------------------------------------------------------------

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("api: {0}")]
    Api(#[from] ApiError),
    #[error("login: {0}")]
    Auth(#[from] AuthError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("session: {0}")]
    Session(#[from] SessionError),
}

impl Error {
    /// HTTP status code carried anywhere in this error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api(err) => err.status_code(),
            Self::Auth(err) => err.status_code(),
            Self::Config(_) | Self::Session(_) => None,
        }
    }
}

/// True when the requested resource does not exist.
pub fn is_not_found(err: &Error) -> bool {
    match err.status_code() {
        Some(code) => code == 404,
        None => matches!(err, Error::Api(ApiError::NotFound)),
    }
}

/// True when the service throttled the request.
pub fn is_rate_limited(err: &Error) -> bool {
    match err.status_code() {
        Some(code) => code == 429,
        None => matches!(err, Error::Api(ApiError::RateLimited)),
    }
}

/// True when the caller must (re)authenticate before retrying.
pub fn is_auth_error(err: &Error) -> bool {
    match err.status_code() {
        Some(code) => code == 401 || code == 403,
        None => match err {
            Error::Api(api) => api.is_auth_error(),
            Error::Auth(auth) => auth.is_credential_rejection(),
            Error::Config(_) | Error::Session(_) => false,
        },
    }
}

/// True for 5xx responses.
pub fn is_server_error(err: &Error) -> bool {
    err.status_code().is_some_and(is_server_status)
}

/// True for failures worth retrying (network, 429, 5xx).
pub fn is_retryable(err: &Error) -> bool {
    match err.status_code() {
        Some(code) => is_retryable_status(code),
        None => match err {
            Error::Api(api) => api.is_retryable(),
            Error::Auth(auth) => auth.is_network_failure(),
            Error::Config(_) | Error::Session(_) => false,
        },
    }
}
