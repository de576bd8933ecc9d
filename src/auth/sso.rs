//! Scripted SSO portal login: cookies → CSRF → credentials → MFA → ticket.

use std::sync::Arc;

use reqwest::header::REFERER;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::error::{AuthError, LoginStage};
use super::http::send_text;
use super::provider::{Endpoints, MFA_FROM_PAGE};
use super::scrape;
use super::types::SsoTicket;

/// Boxed error returned by caller-supplied MFA handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Source of MFA codes, consulted only when the portal asks for one.
///
/// Called on a blocking thread with no timeout, so implementations may wait
/// on terminal input.
pub trait MfaHandler: Send + Sync {
    fn mfa_code(&self) -> Result<String, BoxError>;
}

impl<F> MfaHandler for F
where
    F: Fn() -> Result<String, BoxError> + Send + Sync,
{
    fn mfa_code(&self) -> Result<String, BoxError> {
        self()
    }
}

/// Page title the portal serves once credentials (and MFA) are accepted.
const SUCCESS_TITLE: &str = "Success";

/// One login attempt against the SSO portal.
///
/// `http` must be a login-scoped client with its own cookie store.
pub struct SsoFlow<'a> {
    http: &'a reqwest::Client,
    endpoints: &'a Endpoints,
    cancel: &'a CancellationToken,
}

impl<'a> SsoFlow<'a> {
    pub fn new(
        http: &'a reqwest::Client,
        endpoints: &'a Endpoints,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            http,
            endpoints,
            cancel,
        }
    }

    /// Run the portal flow and return the one-time ticket.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        mfa: Option<Arc<dyn MfaHandler>>,
    ) -> Result<SsoTicket, AuthError> {
        info!(sso = self.endpoints.sso_base(), "starting SSO login");

        let priming = url_for(LoginStage::Priming, self.endpoints.priming_url())?;
        send_text(LoginStage::Priming, self.cancel, self.http.get(priming.clone())).await?;

        let signin = url_for(LoginStage::Csrf, self.endpoints.signin_url())?;
        let html = send_text(
            LoginStage::Csrf,
            self.cancel,
            self.http
                .get(signin.clone())
                .header(REFERER, priming.as_str()),
        )
        .await?;
        let csrf = scrape::csrf_token(&html, LoginStage::Csrf)?;
        debug!("sign-in page loaded");

        let form = [
            ("username", email),
            ("password", password),
            ("embed", "true"),
            ("_csrf", csrf.as_str()),
        ];
        let mut page = send_text(
            LoginStage::Credentials,
            self.cancel,
            self.http
                .post(signin.clone())
                .header(REFERER, signin.as_str())
                .form(&form),
        )
        .await?;
        let mut title = scrape::page_title(&page, LoginStage::Credentials)?;
        debug!(%title, "credentials submitted");

        if title.contains("MFA") {
            let handler = mfa.ok_or(AuthError::MfaRequired)?;
            page = self.submit_mfa(&page, &signin, handler).await?;
            title = scrape::page_title(&page, LoginStage::Mfa)?;
            debug!(%title, "MFA code submitted");
        }

        if title != SUCCESS_TITLE {
            return Err(AuthError::LoginFailed { title });
        }
        let ticket = scrape::ticket(&page)?;
        info!("SSO login succeeded");
        Ok(ticket)
    }

    async fn submit_mfa(
        &self,
        challenge_page: &str,
        referer: &Url,
        handler: Arc<dyn MfaHandler>,
    ) -> Result<String, AuthError> {
        let csrf = scrape::csrf_token(challenge_page, LoginStage::Mfa)?;
        let code = prompt_mfa_code(handler, self.cancel).await?;
        let verify = url_for(LoginStage::Mfa, self.endpoints.verify_mfa_url())?;
        let form = [
            ("mfa-code", code.as_str()),
            ("embed", "true"),
            ("_csrf", csrf.as_str()),
            ("fromPage", MFA_FROM_PAGE),
        ];
        send_text(
            LoginStage::Mfa,
            self.cancel,
            self.http
                .post(verify)
                .header(REFERER, referer.as_str())
                .form(&form),
        )
        .await
    }
}

/// Run the handler off the async runtime, racing cancellation.
async fn prompt_mfa_code(
    handler: Arc<dyn MfaHandler>,
    cancel: &CancellationToken,
) -> Result<String, AuthError> {
    let task = tokio::task::spawn_blocking(move || handler.mfa_code());
    let joined = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(AuthError::Cancelled {
                stage: LoginStage::Mfa,
            })
        }
        joined = task => joined,
    };
    let code = joined
        .map_err(|err| AuthError::Mfa(format!("handler task failed: {err}")))?
        .map_err(|err| AuthError::Mfa(err.to_string()))?;
    let code = code.trim().to_string();
    if code.is_empty() {
        return Err(AuthError::Mfa("handler returned an empty code".to_string()));
    }
    Ok(code)
}

fn url_for(stage: LoginStage, url: Result<Url, url::ParseError>) -> Result<Url, AuthError> {
    url.map_err(|err| AuthError::invalid(stage, format!("bad endpoint URL: {err}")))
}
