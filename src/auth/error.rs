//! Login subsystem error definitions.

use std::fmt;

use thiserror::Error;

/// Step of the login flow an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    /// Fetching the OAuth consumer key/secret.
    Consumer,
    /// Cookie-priming GET against the SSO embed page.
    Priming,
    /// Sign-in page fetch and CSRF extraction.
    Csrf,
    /// Credential form submission.
    Credentials,
    /// MFA challenge and code verification.
    Mfa,
    /// Ticket extraction from the success page.
    Ticket,
    /// Ticket redemption for the OAuth1 token.
    Preauthorized,
    /// OAuth1 → OAuth2 exchange.
    Exchange,
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Consumer => "consumer",
            Self::Priming => "priming",
            Self::Csrf => "csrf",
            Self::Credentials => "credentials",
            Self::Mfa => "mfa",
            Self::Ticket => "ticket",
            Self::Preauthorized => "preauthorized",
            Self::Exchange => "exchange",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the login flow.
///
/// Messages name the failing stage and never carry passwords, tokens, or
/// response bodies.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{stage}: CSRF token not found in page")]
    CsrfNotFound { stage: LoginStage },
    #[error("{stage}: page title not found")]
    TitleNotFound { stage: LoginStage },
    #[error("ticket: SSO ticket not found in success page")]
    TicketNotFound,
    #[error("mfa: account requires MFA but no MFA handler was supplied")]
    MfaRequired,
    #[error("mfa: handler failed: {0}")]
    Mfa(String),
    #[error("credentials: login failed, portal returned page titled `{title}`")]
    LoginFailed { title: String },
    #[error("{stage}: unexpected status {code}")]
    Status { stage: LoginStage, code: u16 },
    #[error("{stage}: http: {source}")]
    Http {
        stage: LoginStage,
        #[source]
        source: reqwest::Error,
    },
    #[error("{stage}: invalid response: {detail}")]
    InvalidResponse { stage: LoginStage, detail: String },
    #[error("{stage}: login cancelled")]
    Cancelled { stage: LoginStage },
}

impl AuthError {
    /// Wrap a reqwest error, stripping the URL so query-string tickets never
    /// reach logs or messages.
    pub(crate) fn http(stage: LoginStage, source: reqwest::Error) -> Self {
        Self::Http {
            stage,
            source: source.without_url(),
        }
    }

    pub(crate) fn invalid(stage: LoginStage, detail: impl Into<String>) -> Self {
        Self::InvalidResponse {
            stage,
            detail: detail.into(),
        }
    }

    /// Stage the failure came from.
    pub fn stage(&self) -> LoginStage {
        match self {
            Self::CsrfNotFound { stage }
            | Self::TitleNotFound { stage }
            | Self::Status { stage, .. }
            | Self::Http { stage, .. }
            | Self::InvalidResponse { stage, .. }
            | Self::Cancelled { stage } => *stage,
            Self::TicketNotFound => LoginStage::Ticket,
            Self::MfaRequired | Self::Mfa(_) => LoginStage::Mfa,
            Self::LoginFailed { .. } => LoginStage::Credentials,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            Self::Http { source, .. } => source.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// True when the portal rejected the user rather than the request shape.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, Self::MfaRequired | Self::Mfa(_) | Self::LoginFailed { .. })
            || self
                .status_code()
                .is_some_and(|code| code == 401 || code == 403)
    }

    /// True for transport-level failures that never produced a status.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Self::Http { source, .. } if source.status().is_none())
    }
}
