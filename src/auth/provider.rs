//! Service domains and the endpoint layout derived from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

/// Regional deployment of the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    #[default]
    #[serde(rename = "garmin.com")]
    Global,
    #[serde(rename = "garmin.cn")]
    China,
}

impl Domain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "garmin.com",
            Self::China => "garmin.cn",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "garmin.com" | "com" | "global" => Ok(Self::Global),
            "garmin.cn" | "cn" | "china" => Ok(Self::China),
            other => Err(format!(
                "unknown domain `{other}`: expected `garmin.com` or `garmin.cn`"
            )),
        }
    }
}

/// Widget id the SSO portal expects on embed/sign-in pages.
const WIDGET_ID: &str = "gauth-widget";
/// `fromPage` marker sent with MFA code submissions.
pub(crate) const MFA_FROM_PAGE: &str = "setupEnterMfaCode";

/// SSO and API base URLs plus the fixed paths hung off them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    sso_base: String,
    api_base: String,
}

impl Endpoints {
    /// Production endpoints for a domain.
    pub fn for_domain(domain: Domain) -> Self {
        Self {
            sso_base: format!("https://sso.{domain}/sso"),
            api_base: format!("https://connectapi.{domain}"),
        }
    }

    /// Explicit bases, e.g. for a local mock of both services.
    pub fn with_bases(sso_base: &str, api_base: &str) -> Result<Self, url::ParseError> {
        Url::parse(sso_base)?;
        Url::parse(api_base)?;
        Ok(Self {
            sso_base: sso_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn sso_base(&self) -> &str {
        &self.sso_base
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Bare embed URL, used as `login-url` and as the sign-in redirect target.
    pub fn embed_url(&self) -> String {
        format!("{}/embed", self.sso_base)
    }

    /// Cookie-priming page.
    pub fn priming_url(&self) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            &self.embed_url(),
            [
                ("id", WIDGET_ID),
                ("embedWidget", "true"),
                ("gauthHost", self.sso_base.as_str()),
            ],
        )
    }

    /// Sign-in page; also the credential POST target.
    pub fn signin_url(&self) -> Result<Url, url::ParseError> {
        self.with_signin_params(&format!("{}/signin", self.sso_base))
    }

    pub fn verify_mfa_url(&self) -> Result<Url, url::ParseError> {
        self.with_signin_params(&format!(
            "{}/verifyMFA/loginEnterMfaCode",
            self.sso_base
        ))
    }

    fn with_signin_params(&self, base: &str) -> Result<Url, url::ParseError> {
        let embed = self.embed_url();
        Url::parse_with_params(
            base,
            [
                ("id", WIDGET_ID),
                ("embedWidget", "true"),
                ("gauthHost", embed.as_str()),
                ("service", embed.as_str()),
                ("source", embed.as_str()),
                ("redirectAfterAccountLoginUrl", embed.as_str()),
                ("redirectAfterAccountCreationUrl", embed.as_str()),
            ],
        )
    }

    /// Ticket redemption endpoint.
    pub fn preauthorized_url(&self, ticket: &str) -> Result<Url, url::ParseError> {
        let embed = self.embed_url();
        Url::parse_with_params(
            &format!("{}/oauth-service/oauth/preauthorized", self.api_base),
            [
                ("ticket", ticket),
                ("login-url", embed.as_str()),
                ("accepts-mfa-tokens", "true"),
            ],
        )
    }

    /// OAuth1 → OAuth2 exchange endpoint.
    pub fn exchange_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}/oauth-service/oauth/exchange/user/2.0",
            self.api_base
        ))
    }

    /// Resolve an API path (`/usage-service/...`) against the API base.
    pub fn api_url(&self, path: &str) -> Result<Url, url::ParseError> {
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{}/{path}", self.api_base))
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::for_domain(Domain::default())
    }
}
