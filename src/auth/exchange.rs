//! Ticket redemption and OAuth1 → OAuth2 exchange.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::{AuthError, LoginStage};
use super::http::send_text;
use super::oauth1::{authorization_header, ConsumerCredentials, TokenCredentials};
use super::provider::Endpoints;
use super::types::{OAuth1Token, OAuth2Token, SsoTicket};

/// Redeem an SSO ticket for an OAuth1 token pair.
///
/// The request is signed with the consumer credentials only.
pub async fn redeem_ticket(
    http: &reqwest::Client,
    endpoints: &Endpoints,
    consumer: &ConsumerCredentials,
    ticket: SsoTicket,
    cancel: &CancellationToken,
) -> Result<OAuth1Token, AuthError> {
    let stage = LoginStage::Preauthorized;
    let url = endpoints
        .preauthorized_url(ticket.as_str())
        .map_err(|err| AuthError::invalid(stage, format!("bad endpoint URL: {err}")))?;
    let header = authorization_header("GET", &url, &[], consumer, None)
        .map_err(|_| AuthError::invalid(stage, "consumer secret rejected by HMAC"))?;
    drop(ticket);

    let body = send_text(stage, cancel, http.get(url).header(AUTHORIZATION, header)).await?;
    let token = parse_oauth1_body(&body)?;
    info!(mfa = token.mfa_token.is_some(), "ticket redeemed for OAuth1 token");
    Ok(token)
}

/// Parse the form-encoded preauthorized response body.
fn parse_oauth1_body(body: &str) -> Result<OAuth1Token, AuthError> {
    let mut fields: HashMap<String, String> = url::form_urlencoded::parse(body.trim().as_bytes())
        .into_owned()
        .collect();
    let mut required = |name: &str| {
        fields
            .remove(name)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AuthError::invalid(LoginStage::Preauthorized, format!("missing `{name}`")))
    };
    let token = required("oauth_token")?;
    let secret = required("oauth_token_secret")?;
    Ok(OAuth1Token {
        token,
        secret,
        mfa_token: fields.remove("mfa_token").filter(|v| !v.is_empty()),
        mfa_expiration: fields
            .remove("mfa_expiration_timestamp")
            .filter(|v| !v.is_empty()),
    })
}

#[derive(Deserialize)]
struct ExchangeResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    scope: Option<String>,
    expires_in: i64,
    #[serde(default)]
    refresh_token_expires_in: Option<i64>,
}

/// Trade an OAuth1 pair for an OAuth2 bearer token.
///
/// The request is signed with consumer and token credentials; an MFA token
/// travels as a form field and is part of the signature.
pub async fn exchange_oauth2(
    http: &reqwest::Client,
    endpoints: &Endpoints,
    consumer: &ConsumerCredentials,
    oauth1: &OAuth1Token,
    cancel: &CancellationToken,
) -> Result<OAuth2Token, AuthError> {
    let stage = LoginStage::Exchange;
    let url = endpoints
        .exchange_url()
        .map_err(|err| AuthError::invalid(stage, format!("bad endpoint URL: {err}")))?;
    let mut form: Vec<(String, String)> = Vec::new();
    if let Some(mfa_token) = &oauth1.mfa_token {
        form.push(("mfa_token".to_string(), mfa_token.clone()));
    }
    let token = TokenCredentials {
        token: &oauth1.token,
        secret: &oauth1.secret,
    };
    let header = authorization_header("POST", &url, &form, consumer, Some(token))
        .map_err(|_| AuthError::invalid(stage, "consumer secret rejected by HMAC"))?;

    let body = send_text(
        stage,
        cancel,
        http.post(url).header(AUTHORIZATION, header).form(&form),
    )
    .await?;
    let wire: ExchangeResponse = serde_json::from_str(&body)
        .map_err(|err| AuthError::invalid(stage, format!("token response: {err}")))?;
    if wire.access_token.is_empty() {
        return Err(AuthError::invalid(stage, "token response has an empty access_token"));
    }

    let expires_at = Duration::try_seconds(wire.expires_in)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| AuthError::invalid(stage, "expires_in out of range"))?;
    debug!(expires_in = wire.expires_in, "exchanged OAuth1 token for OAuth2");
    Ok(OAuth2Token {
        access_token: wire.access_token,
        refresh_token: wire.refresh_token,
        token_type: wire.token_type,
        scope: wire.scope,
        expires_in: wire.expires_in,
        expires_at,
        refresh_token_expires_in: wire.refresh_token_expires_in,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::oauth1::authorization_header_at;
    use percent_encoding::percent_decode_str;
    use wiremock::matchers::{body_string_contains, header_regex, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn consumer() -> ConsumerCredentials {
        ConsumerCredentials {
            consumer_key: "fc3e99d2-118c-44b8-8ae3-03370dde24c0".into(),
            consumer_secret: "E08WAR897WEy2knn7aFBrvegVAf0AFdWBBF".into(),
        }
    }

    fn oauth1(mfa_token: Option<&str>) -> OAuth1Token {
        OAuth1Token {
            token: "o1-token".into(),
            secret: "o1-secret".into(),
            mfa_token: mfa_token.map(str::to_string),
            mfa_expiration: None,
        }
    }

    async fn server() -> (MockServer, Endpoints) {
        let server = MockServer::start().await;
        let endpoints =
            Endpoints::with_bases(&format!("{}/sso", server.uri()), &server.uri()).expect("bases");
        (server, endpoints)
    }

    fn header_params(header: &str) -> HashMap<String, String> {
        header
            .trim_start_matches("OAuth ")
            .split(", ")
            .filter_map(|pair| pair.split_once('='))
            .map(|(key, value)| {
                let value = value.trim_matches('"');
                (
                    key.to_string(),
                    percent_decode_str(value).decode_utf8_lossy().into_owned(),
                )
            })
            .collect()
    }

    #[test]
    fn oauth1_body_parses_optional_mfa_fields() {
        let token = parse_oauth1_body(
            "oauth_token=t&oauth_token_secret=s&mfa_token=m&mfa_expiration_timestamp=2026-11-01%2012%3A00%3A00.000",
        )
        .expect("token");
        assert_eq!(token.token, "t");
        assert_eq!(token.secret, "s");
        assert_eq!(token.mfa_token.as_deref(), Some("m"));
        assert_eq!(
            token.mfa_expiration.as_deref(),
            Some("2026-11-01 12:00:00.000")
        );

        let plain = parse_oauth1_body("oauth_token=t&oauth_token_secret=s\n").expect("token");
        assert!(plain.mfa_token.is_none());
    }

    #[test]
    fn oauth1_body_without_secret_is_invalid() {
        let err = parse_oauth1_body("oauth_token=t").unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidResponse {
                stage: LoginStage::Preauthorized,
                ..
            }
        ));
        assert!(err.to_string().contains("oauth_token_secret"));
    }

    #[tokio::test]
    async fn redeem_ticket_sends_consumer_signed_request() {
        let (server, endpoints) = server().await;
        Mock::given(method("GET"))
            .and(path("/oauth-service/oauth/preauthorized"))
            .and(query_param("ticket", "ST-1"))
            .and(query_param("accepts-mfa-tokens", "true"))
            .and(header_regex("authorization", "^OAuth .*oauth_signature="))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("oauth_token=t1&oauth_token_secret=s1"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let token = redeem_ticket(
            &http,
            &endpoints,
            &consumer(),
            SsoTicket::new("ST-1".into()),
            &CancellationToken::new(),
        )
        .await
        .expect("redeem");
        assert_eq!(token.token, "t1");
        assert_eq!(token.secret, "s1");

        // The signature must verify against the URL the server actually saw.
        let requests = server.received_requests().await.expect("recorded");
        let request = &requests[0];
        let header = request
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .expect("authorization header");
        let params = header_params(header);
        assert!(!params.contains_key("oauth_token"));
        let expected = authorization_header_at(
            "GET",
            &request.url,
            &[],
            &consumer(),
            None,
            &params["oauth_timestamp"],
            &params["oauth_nonce"],
        )
        .expect("header");
        assert_eq!(header, expected);
    }

    #[tokio::test]
    async fn exchange_signs_with_token_and_sends_mfa_token() {
        let (server, endpoints) = server().await;
        Mock::given(method("POST"))
            .and(path("/oauth-service/oauth/exchange/user/2.0"))
            .and(header_regex("authorization", "oauth_token=\"o1-token\""))
            .and(body_string_contains("mfa_token=mfa-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "scope": "CONNECT_READ CONNECT_WRITE",
                "jti": "ignored",
                "access_token": "a2",
                "token_type": "Bearer",
                "refresh_token": "r2",
                "expires_in": 3600,
                "refresh_token_expires_in": 7200,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let before = Utc::now();
        let token = exchange_oauth2(
            &reqwest::Client::new(),
            &endpoints,
            &consumer(),
            &oauth1(Some("mfa-123")),
            &CancellationToken::new(),
        )
        .await
        .expect("exchange");
        assert_eq!(token.access_token, "a2");
        assert_eq!(token.refresh_token, "r2");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.scope.as_deref(), Some("CONNECT_READ CONNECT_WRITE"));
        assert_eq!(token.refresh_token_expires_in, Some(7200));
        assert!(token.expires_at >= before + Duration::seconds(3600));
        assert!(token.expires_at <= Utc::now() + Duration::seconds(3600));
    }

    #[tokio::test]
    async fn exchange_rejection_reports_status() {
        let (server, endpoints) = server().await;
        Mock::given(method("POST"))
            .and(path("/oauth-service/oauth/exchange/user/2.0"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad o1-secret"))
            .mount(&server)
            .await;

        let err = exchange_oauth2(
            &reqwest::Client::new(),
            &endpoints,
            &consumer(),
            &oauth1(None),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Status {
                stage: LoginStage::Exchange,
                code: 401
            }
        ));
        assert!(err.is_credential_rejection());
        assert!(!err.to_string().contains("o1-secret"));
    }

    #[tokio::test]
    async fn exchange_rejects_out_of_range_lifetime() {
        let (server, endpoints) = server().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "a",
                "expires_in": i64::MAX,
            })))
            .mount(&server)
            .await;

        let err = exchange_oauth2(
            &reqwest::Client::new(),
            &endpoints,
            &consumer(),
            &oauth1(None),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        match err {
            AuthError::InvalidResponse { stage, detail } => {
                assert_eq!(stage, LoginStage::Exchange);
                assert_eq!(detail, "expires_in out of range");
            }
            other => panic!("expected invalid response, got {other}"),
        }
    }

    #[tokio::test]
    async fn exchange_rejects_malformed_json() {
        let (server, endpoints) = server().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = exchange_oauth2(
            &reqwest::Client::new(),
            &endpoints,
            &consumer(),
            &oauth1(None),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidResponse {
                stage: LoginStage::Exchange,
                ..
            }
        ));
    }
}
