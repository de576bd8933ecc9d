//! Client facade: login, session state, and authenticated API calls.
//!
//! The facade itself stays small:
//! - bearer resolution is delegated to `auth`.
//! - the HTTP seam and client construction live in `transport`.
//! - rate limiting, retries, and backoff live in `retry`.

mod auth;
mod retry;
mod transport;

use std::io::{Read, Write};
use std::sync::{Arc, PoisonError, RwLock};

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::rate_limit::RateLimiter;
use crate::auth::http::login_http_client;
use crate::auth::{
    exchange_oauth2, fetch_consumer, read_session, redeem_ticket, write_session, AuthError,
    ConsumerCredentials, MfaHandler, Session, SsoFlow,
};
use crate::config::ClientConfig;
use crate::error::{ApiError, Error, SessionError};

pub use retry::{Backoff, RetryPolicy, RetryingTransport};
pub use transport::HttpSend;

/// Authenticated client for the Connect API.
///
/// Holds one [`Session`] at a time. A login or refresh builds a complete
/// replacement session and swaps it in; readers never see a partial one.
/// Requests go to the session's own domain unless the config pins endpoints.
pub struct Client {
    config: ClientConfig,
    /// Builds requests; sending goes through `transport`.
    builder: reqwest::Client,
    transport: RetryingTransport,
    session: RwLock<Arc<Session>>,
    consumer: OnceCell<ConsumerCredentials>,
}

impl Client {
    /// Build a client that sends through `reqwest`.
    pub fn new(config: ClientConfig) -> Self {
        let http = transport::build_http_client(config.timeout);
        Self::with_transport(config, Arc::new(http))
    }

    /// Build a client over a caller-supplied HTTP seam.
    pub fn with_transport(config: ClientConfig, http: Arc<dyn HttpSend>) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.requests_per_minute,
            config.rate_limit.burst,
        ));
        let backoff = Backoff::new(RetryPolicy::from(&config.retry));
        Self {
            builder: reqwest::Client::new(),
            transport: RetryingTransport::new(http, limiter, backoff),
            session: RwLock::new(Arc::new(Session::default())),
            consumer: OnceCell::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------------

    /// Log in with email and password, publishing a new session on success.
    ///
    /// `mfa` is consulted only if the portal asks for a code. Any failure,
    /// including cancellation, leaves the current session untouched.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        mfa: Option<Arc<dyn MfaHandler>>,
        cancel: &CancellationToken,
    ) -> Result<(), AuthError> {
        let http = login_http_client(self.config.timeout)?;
        let consumer = self.consumer(&http, cancel).await?;
        let endpoints = self.config.endpoints_for(self.config.domain);

        let ticket = SsoFlow::new(&http, &endpoints, cancel)
            .login(email, password, mfa)
            .await?;
        let oauth1 = redeem_ticket(&http, &endpoints, &consumer, ticket, cancel).await?;
        let oauth2 = exchange_oauth2(&http, &endpoints, &consumer, &oauth1, cancel).await?;

        self.set_session(Session::from_tokens(oauth1, oauth2, self.config.domain));
        info!(domain = %self.config.domain, "login complete");
        Ok(())
    }

    /// Re-run the OAuth1 → OAuth2 exchange with the stored OAuth1 pair and
    /// publish the refreshed session.
    pub async fn refresh_oauth2(&self, cancel: &CancellationToken) -> Result<(), Error> {
        let current = self.session();
        let oauth1 = current.oauth1().ok_or(ApiError::NotAuthenticated)?;

        let http = login_http_client(self.config.timeout)?;
        let consumer = self.consumer(&http, cancel).await?;
        let endpoints = self.config.endpoints_for(current.domain);
        let oauth2 = exchange_oauth2(&http, &endpoints, &consumer, &oauth1, cancel).await?;

        self.set_session(Session::from_tokens(oauth1, oauth2, current.domain));
        info!("OAuth2 token refreshed");
        Ok(())
    }

    async fn consumer(
        &self,
        http: &reqwest::Client,
        cancel: &CancellationToken,
    ) -> Result<ConsumerCredentials, AuthError> {
        if let Some(consumer) = &self.config.consumer {
            return Ok(consumer.clone());
        }
        self.consumer
            .get_or_try_init(|| fetch_consumer(http, &self.config.consumer_url, cancel))
            .await
            .cloned()
    }

    // -----------------------------------------------------------------------
    // Session state
    // -----------------------------------------------------------------------

    /// Snapshot of the current session.
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the current session wholesale.
    pub fn set_session(&self, session: Session) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(session);
    }

    pub fn clear_session(&self) {
        self.set_session(Session::default());
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    /// Read a JSON session and make it current.
    ///
    /// Later requests and refreshes follow the session's domain, not the
    /// configured one.
    pub fn load_session<R: Read>(&self, reader: R) -> Result<(), SessionError> {
        let session = read_session(reader)?;
        if session.domain != self.config.domain {
            info!(
                session_domain = %session.domain,
                client_domain = %self.config.domain,
                "loaded session belongs to another domain; using its endpoints"
            );
        }
        self.set_session(session);
        Ok(())
    }

    /// Write the current session as JSON.
    pub fn save_session<W: Write>(&self, writer: W) -> Result<(), SessionError> {
        write_session(&self.session(), writer)
    }

    // -----------------------------------------------------------------------
    // API calls
    // -----------------------------------------------------------------------

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        let response = self.execute(Method::GET, path, None, cancel).await?;
        decode_json(path, response, cancel).await
    }

    /// Send `body` as JSON with `method` and decode the JSON reply.
    pub async fn send_json<T, B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(body)
            .map_err(|err| ApiError::InvalidRequest(format!("encode body: {err}")))?;
        let response = self.execute(method, path, Some(bytes), cancel).await?;
        decode_json(path, response, cancel).await
    }

    /// DELETE `path`; any 2xx (including 204) is success.
    pub async fn delete(&self, path: &str, cancel: &CancellationToken) -> Result<(), ApiError> {
        self.execute(Method::DELETE, path, None, cancel).await?;
        Ok(())
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, ApiError> {
        let session = self.session();
        let bearer = auth::bearer_token(&session)?;
        let url = self
            .config
            .endpoints_for(session.domain)
            .api_url(path)
            .map_err(|err| ApiError::InvalidRequest(format!("bad path `{path}`: {err}")))?;

        let mut request = self
            .builder
            .request(method.clone(), url)
            .bearer_auth(bearer)
            .header(ACCEPT, "application/json");
        if let Some(bytes) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(bytes);
        }
        let request = request.build()?;

        let response = self.transport.send(request, cancel).await?;
        let status = response.status();
        debug!(%method, endpoint = path, status = status.as_u16(), "api call");
        if status.as_u16() == 404 {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            let body = read_body(response, cancel).await?;
            return Err(ApiError::status(status.as_u16(), path, body));
        }
        Ok(response)
    }
}

async fn read_body(
    response: reqwest::Response,
    cancel: &CancellationToken,
) -> Result<String, ApiError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
        body = response.text() => Ok(body?),
    }
}

/// Decode a 2xx body; 204 means there is nothing to decode.
async fn decode_json<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
    cancel: &CancellationToken,
) -> Result<T, ApiError> {
    if response.status().as_u16() == 204 {
        return Err(ApiError::NotFound);
    }
    let body = read_body(response, cancel).await?;
    serde_json::from_str(&body)
        .map_err(|err| ApiError::InvalidResponse(format!("{path}: {err}")))
}
