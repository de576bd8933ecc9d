//! Bearer resolution for API requests.
//!
//! Checked before any network I/O so unauthenticated or stale sessions fail
//! fast with a sentinel the caller can act on.

use chrono::{DateTime, Utc};

use crate::auth::Session;
use crate::error::ApiError;

/// Resolve the OAuth2 bearer for outbound API requests.
pub(super) fn bearer_token(session: &Session) -> Result<&str, ApiError> {
    bearer_token_at(session, Utc::now())
}

pub(super) fn bearer_token_at(session: &Session, now: DateTime<Utc>) -> Result<&str, ApiError> {
    if !session.is_authenticated() {
        return Err(ApiError::NotAuthenticated);
    }
    if session.is_expired_at(now) {
        return Err(ApiError::SessionExpired);
    }
    Ok(&session.oauth2_access_token)
}
