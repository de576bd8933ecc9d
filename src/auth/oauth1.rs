//! OAuth 1.0a HMAC-SHA1 request signing (RFC 5849).

use std::fmt;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use sha1::Sha1;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters: A-Z a-z 0-9 - . _ ~
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_LEN: usize = 32;

/// Application (consumer) credentials shared by every user of the service.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct ConsumerCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl fmt::Debug for ConsumerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .finish()
    }
}

/// User token pair used for signed requests after ticket redemption.
#[derive(Clone, Copy)]
pub struct TokenCredentials<'a> {
    pub token: &'a str,
    pub secret: &'a str,
}

/// Percent-encode per RFC 3986: unreserved bytes pass through, everything
/// else becomes upper-case `%XX`.
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, UNRESERVED).to_string()
}

/// `scheme://host[:port]/path`, dropping default ports, query, and fragment.
fn base_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    format!("{}://{host}{port}{}", url.scheme(), url.path())
}

/// Build the signature base string (RFC 5849 §3.4.1).
///
/// Pairs are sorted by encoded key, then encoded value; duplicates are kept.
pub fn base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&base_url(url)),
        percent_encode(&normalized)
    )
}

/// `enc(consumer_secret)&enc(token_secret)`; either side may be empty.
pub fn signing_key(consumer_secret: &str, token_secret: &str) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    )
}

/// HMAC-SHA1 over the base string, base64-encoded.
pub fn sign(base_string: &str, key: &str) -> Result<String, InvalidLength> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())?;
    mac.update(base_string.as_bytes());
    Ok(B64.encode(mac.finalize().into_bytes()))
}

fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

fn generate_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Build an `Authorization: OAuth ...` header value with a fresh nonce and
/// timestamp.
///
/// Query parameters from `url` and `form_params` (the decoded
/// `application/x-www-form-urlencoded` body, if any) are signed but only the
/// `oauth_*` parameters are rendered in the header.
pub fn authorization_header(
    method: &str,
    url: &Url,
    form_params: &[(String, String)],
    consumer: &ConsumerCredentials,
    token: Option<TokenCredentials<'_>>,
) -> Result<String, InvalidLength> {
    authorization_header_at(
        method,
        url,
        form_params,
        consumer,
        token,
        &generate_timestamp(),
        &generate_nonce(),
    )
}

/// Deterministic variant of [`authorization_header`].
pub fn authorization_header_at(
    method: &str,
    url: &Url,
    form_params: &[(String, String)],
    consumer: &ConsumerCredentials,
    token: Option<TokenCredentials<'_>>,
    timestamp: &str,
    nonce: &str,
) -> Result<String, InvalidLength> {
    let mut oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), consumer.consumer_key.clone()),
        ("oauth_nonce".into(), nonce.to_string()),
        ("oauth_signature_method".into(), SIGNATURE_METHOD.into()),
        ("oauth_timestamp".into(), timestamp.to_string()),
    ];
    if let Some(token) = token {
        oauth_params.push(("oauth_token".into(), token.token.to_string()));
    }
    oauth_params.push(("oauth_version".into(), OAUTH_VERSION.into()));

    let mut params = oauth_params.clone();
    params.extend(
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned())),
    );
    params.extend(form_params.iter().cloned());

    let base = base_string(method, url, &params);
    let key = signing_key(
        &consumer.consumer_secret,
        token.map_or("", |token| token.secret),
    );
    let signature = sign(&base, &key)?;

    oauth_params.push(("oauth_signature".into(), signature));
    oauth_params.sort();
    let rendered = oauth_params
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {rendered}"))
}
