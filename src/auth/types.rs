//! Public auth model types.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::provider::Domain;

/// Sessions this close to OAuth2 expiry are treated as already expired.
const EXPIRY_SAFETY_WINDOW_SECS: i64 = 5 * 60;

/// Persisted credential record.
///
/// A client starts with `Session::default()` and replaces the whole value
/// after a successful login; fields are never patched one at a time.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub oauth1_token: String,
    #[serde(default)]
    pub oauth1_secret: String,
    /// Step-up token returned with the OAuth1 pair on MFA accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_token: Option<String>,
    #[serde(default)]
    pub oauth2_access_token: String,
    #[serde(default)]
    pub oauth2_refresh_token: String,
    #[serde(default)]
    pub oauth2_expiry: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2_scope: Option<String>,
    #[serde(default)]
    pub domain: Domain,
}

impl Session {
    /// Assemble a session from freshly exchanged credentials.
    pub fn from_tokens(oauth1: OAuth1Token, oauth2: OAuth2Token, domain: Domain) -> Self {
        Self {
            oauth1_token: oauth1.token,
            oauth1_secret: oauth1.secret,
            mfa_token: oauth1.mfa_token,
            oauth2_access_token: oauth2.access_token,
            oauth2_refresh_token: oauth2.refresh_token,
            oauth2_expiry: oauth2.expires_at,
            oauth2_scope: oauth2.scope,
            domain,
        }
    }

    /// Both the OAuth1 token and the OAuth2 access token are present.
    pub fn is_authenticated(&self) -> bool {
        !self.oauth1_token.is_empty() && !self.oauth2_access_token.is_empty()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Expired once `now` is within five minutes of the stored expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SAFETY_WINDOW_SECS) >= self.oauth2_expiry
    }

    /// OAuth1 pair held by this session, if any.
    pub fn oauth1(&self) -> Option<OAuth1Token> {
        if self.oauth1_token.is_empty() {
            return None;
        }
        Some(OAuth1Token {
            token: self.oauth1_token.clone(),
            secret: self.oauth1_secret.clone(),
            mfa_token: self.mfa_token.clone(),
            mfa_expiration: None,
        })
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("has_oauth1", &!self.oauth1_token.is_empty())
            .field("has_mfa_token", &self.mfa_token.is_some())
            .field("has_oauth2", &!self.oauth2_access_token.is_empty())
            .field("oauth2_expiry", &self.oauth2_expiry)
            .field("oauth2_scope", &self.oauth2_scope)
            .field("domain", &self.domain)
            .finish()
    }
}

/// Single-use proof of a successful SSO login.
///
/// Not `Clone`: redeeming it consumes it.
pub struct SsoTicket(String);

impl SsoTicket {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SsoTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SsoTicket(<redacted>)")
    }
}

/// Token pair returned by ticket redemption.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuth1Token {
    pub token: String,
    pub secret: String,
    pub mfa_token: Option<String>,
    /// Raw `mfa_expiration_timestamp` as sent by the service.
    pub mfa_expiration: Option<String>,
}

impl fmt::Debug for OAuth1Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Token")
            .field("has_mfa_token", &self.mfa_token.is_some())
            .field("mfa_expiration", &self.mfa_expiration)
            .finish_non_exhaustive()
    }
}

/// Bearer credential used for ordinary API calls.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuth2Token {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub scope: Option<String>,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
    pub refresh_token_expires_in: Option<i64>,
}

impl fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
