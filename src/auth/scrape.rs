//! Extraction of login-flow markers from SSO portal HTML.
//!
//! Each extractor fails with a dedicated not-found error so portal markup
//! changes surface at the step that broke instead of as a confusing failure
//! further down the flow.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use super::error::{AuthError, LoginStage};
use super::types::SsoTicket;

static TICKET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"embed\?ticket=([^"&\s]+)""#).expect("valid ticket pattern"));

/// Hidden `_csrf` form field value.
pub fn csrf_token(html: &str, stage: LoginStage) -> Result<String, AuthError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"input[name="_csrf"]"#).expect("valid csrf selector");
    document
        .select(&selector)
        .filter_map(|input| input.value().attr("value"))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(AuthError::CsrfNotFound { stage })
}

/// Text of the page `<title>`, whitespace-collapsed.
///
/// Runs of whitespace become one space and the ends are trimmed, so a title
/// of `"\n  Success \n"` compares equal to `"Success"`.
pub fn page_title(html: &str, stage: LoginStage) -> Result<String, AuthError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").expect("valid title selector");
    document
        .select(&selector)
        .map(|title| {
            title
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .find(|text| !text.is_empty())
        .ok_or(AuthError::TitleNotFound { stage })
}

/// One-time ticket embedded in the success page's redirect script.
pub fn ticket(html: &str) -> Result<SsoTicket, AuthError> {
    TICKET_PATTERN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| SsoTicket::new(m.as_str().to_string()))
        .ok_or(AuthError::TicketNotFound)
}
