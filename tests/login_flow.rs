//! End-to-end login scenarios against a local mock of the SSO portal and
//! the OAuth/API host.

use std::sync::Arc;
use std::time::Duration;

use gconnect::api::Client;
use gconnect::auth::{AuthError, BoxError, Endpoints, LoginStage, MfaHandler, Session};
use gconnect::config::ClientConfig;
use gconnect::error::ApiError;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TICKET: &str = "ST-0421337-AbCdEfGhIjKlMnOp-cas";

const SIGNIN_HTML: &str = r#"<html><head><title>GARMIN Authentication Application</title></head>
<body><form><input type="hidden" name="_csrf" value="CSRF-ONE"/></form></body></html>"#;

const MFA_HTML: &str = r#"<html><head><title>Enter MFA code for login</title></head>
<body><form><input type="hidden" name="_csrf" value="CSRF-TWO"/></form></body></html>"#;

fn success_html() -> String {
    format!(
        r#"<html><head><title>Success</title>
<script>var response_url = "https:\/\/sso.garmin.com\/sso\/embed?ticket={TICKET}";</script>
</head><body></body></html>"#
    )
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_string(body.into())
}

fn exchange_body(access_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "scope": "CONNECT_READ CONNECT_WRITE",
        "access_token": access_token,
        "token_type": "Bearer",
        "refresh_token": "refresh-1",
        "expires_in": 3600,
        "refresh_token_expires_in": 7200,
    }))
}

/// Mount the portal up to the credential POST, which answers with `after_credentials`.
async fn mount_portal(server: &MockServer, after_credentials: String) {
    Mock::given(method("GET"))
        .and(path("/oauth_consumer.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "consumer_key": "ck",
            "consumer_secret": "cs",
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sso/embed"))
        .respond_with(html("<html></html>"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sso/signin"))
        .respond_with(html(SIGNIN_HTML))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sso/signin"))
        .and(body_string_contains("_csrf=CSRF-ONE"))
        .respond_with(html(after_credentials))
        .mount(server)
        .await;
}

async fn mount_token_service(server: &MockServer, exchange: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/oauth-service/oauth/preauthorized"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(
                "oauth_token=o1-token&oauth_token_secret=o1-secret&mfa_token=mfa-abc",
            ),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth-service/oauth/exchange/user/2.0"))
        .respond_with(exchange)
        .mount(server)
        .await;
}

fn client_for(server: &MockServer) -> Client {
    let mut config = ClientConfig::default();
    config.endpoints = Some(
        Endpoints::with_bases(&format!("{}/sso", server.uri()), &server.uri()).expect("bases"),
    );
    config.consumer_url = format!("{}/oauth_consumer.json", server.uri());
    config.timeout = Duration::from_secs(5);
    config.rate_limit.requests_per_minute = 6_000;
    config.rate_limit.burst = 100;
    Client::new(config)
}

fn sentinel_session() -> Session {
    Session {
        oauth1_token: "previous".into(),
        oauth1_secret: "previous-secret".into(),
        oauth2_access_token: "previous-access".into(),
        oauth2_expiry: chrono::Utc::now() + chrono::Duration::hours(1),
        ..Session::default()
    }
}

#[tokio::test]
async fn login_without_mfa_publishes_session() {
    let server = MockServer::start().await;
    mount_portal(&server, success_html()).await;
    mount_token_service(&server, exchange_body("access-1")).await;
    Mock::given(method("GET"))
        .and(path("/userprofile-service/socialProfile"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();
    client
        .login("user@example.com", "hunter2", None, &cancel)
        .await
        .expect("login");

    let session = client.session();
    assert!(session.is_authenticated());
    assert!(!session.is_expired());
    assert_eq!(session.oauth1_token, "o1-token");
    assert_eq!(session.mfa_token.as_deref(), Some("mfa-abc"));
    assert_eq!(session.oauth2_access_token, "access-1");
    assert_eq!(session.oauth2_refresh_token, "refresh-1");

    let profile: serde_json::Value = client
        .get_json("/userprofile-service/socialProfile", &cancel)
        .await
        .expect("profile");
    assert_eq!(profile["id"], 7);
}

#[tokio::test]
async fn login_with_mfa_handler_completes() {
    let server = MockServer::start().await;
    mount_portal(&server, MFA_HTML.to_string()).await;
    Mock::given(method("POST"))
        .and(path("/sso/verifyMFA/loginEnterMfaCode"))
        .and(body_string_contains("mfa-code=654321"))
        .and(body_string_contains("_csrf=CSRF-TWO"))
        .respond_with(html(success_html()))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_service(&server, exchange_body("access-mfa")).await;

    let client = client_for(&server);
    let handler: Arc<dyn MfaHandler> =
        Arc::new(|| -> Result<String, BoxError> { Ok("654321".to_string()) });
    client
        .login(
            "user@example.com",
            "hunter2",
            Some(handler),
            &CancellationToken::new(),
        )
        .await
        .expect("login");
    assert_eq!(client.session().oauth2_access_token, "access-mfa");
}

#[tokio::test]
async fn mfa_without_handler_leaves_session_untouched() {
    let server = MockServer::start().await;
    mount_portal(&server, MFA_HTML.to_string()).await;
    mount_token_service(&server, exchange_body("unused")).await;

    let client = client_for(&server);
    let previous = sentinel_session();
    client.set_session(previous.clone());
    let err = client
        .login("user@example.com", "hunter2", None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::MfaRequired), "{err}");
    assert_eq!(*client.session(), previous);
}

#[tokio::test]
async fn wrong_title_reports_login_failed() {
    let server = MockServer::start().await;
    mount_portal(&server, SIGNIN_HTML.to_string()).await;

    let client = client_for(&server);
    client.set_session(sentinel_session());
    let err = client
        .login("user@example.com", "wrong-password", None, &CancellationToken::new())
        .await
        .unwrap_err();
    match &err {
        AuthError::LoginFailed { title } => assert_eq!(title, "GARMIN Authentication Application"),
        other => panic!("expected LoginFailed, got {other}"),
    }
    assert!(!err.to_string().contains("wrong-password"));
    assert_eq!(client.session().oauth1_token, "previous");
}

#[tokio::test]
async fn success_page_without_ticket_fails() {
    let server = MockServer::start().await;
    mount_portal(
        &server,
        "<html><head><title>Success</title></head><body></body></html>".to_string(),
    )
    .await;

    let client = client_for(&server);
    let err = client
        .login("user@example.com", "hunter2", None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TicketNotFound), "{err}");
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn exchange_rejection_leaves_session_untouched() {
    let server = MockServer::start().await;
    mount_portal(&server, success_html()).await;
    mount_token_service(&server, ResponseTemplate::new(401)).await;

    let client = client_for(&server);
    client.set_session(sentinel_session());
    let err = client
        .login("user@example.com", "hunter2", None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), LoginStage::Exchange);
    assert_eq!(err.status_code(), Some(401));
    assert!(gconnect::error::is_auth_error(&err.into()));
    assert_eq!(client.session().oauth2_access_token, "previous-access");
}

#[tokio::test]
async fn cancelled_login_leaves_session_untouched() {
    let server = MockServer::start().await;
    mount_portal(&server, success_html()).await;
    mount_token_service(&server, exchange_body("unused")).await;

    let client = client_for(&server);
    client.set_session(sentinel_session());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client
        .login("user@example.com", "hunter2", None, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Cancelled { .. }), "{err}");
    assert_eq!(client.session().oauth1_token, "previous");
}

#[tokio::test]
async fn consumer_document_is_fetched_once_and_refresh_replaces_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth_consumer.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "consumer_key": "ck",
            "consumer_secret": "cs",
        })))
        .expect(1)
        .named("consumer document")
        .mount(&server)
        .await;
    mount_portal(&server, success_html()).await;
    Mock::given(method("GET"))
        .and(path("/oauth-service/oauth/preauthorized"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("oauth_token=o1-token&oauth_token_secret=o1-secret"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth-service/oauth/exchange/user/2.0"))
        .respond_with(exchange_body("access-1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth-service/oauth/exchange/user/2.0"))
        .respond_with(exchange_body("access-2"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();
    client
        .login("user@example.com", "hunter2", None, &cancel)
        .await
        .expect("login");
    assert_eq!(client.session().oauth2_access_token, "access-1");

    client.refresh_oauth2(&cancel).await.expect("refresh");
    let session = client.session();
    assert_eq!(session.oauth2_access_token, "access-2");
    assert_eq!(session.oauth1_token, "o1-token");
}

#[tokio::test]
async fn api_errors_after_login_are_classified() {
    let server = MockServer::start().await;
    mount_portal(&server, success_html()).await;
    mount_token_service(&server, exchange_body("access-1")).await;
    Mock::given(method("GET"))
        .and(path("/activity-service/activity/1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();
    client
        .login("user@example.com", "hunter2", None, &cancel)
        .await
        .expect("login");
    let err = client
        .get_json::<serde_json::Value>("/activity-service/activity/1", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
}
