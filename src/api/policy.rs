//! Response classification rules for the retrying transport.

use crate::error::is_retryable_status;

/// What the transport should do with one attempt's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Hand the outcome to the caller as-is.
    Return,
    /// Drain, back off, and try again.
    Retry,
}

/// Classify a completed round trip by status code.
pub(crate) fn classify_status(code: u16) -> Disposition {
    if is_retryable_status(code) {
        Disposition::Retry
    } else {
        Disposition::Return
    }
}

/// Classify a transport failure. Errors that never produced a status are
/// network-level and retryable, except requests that could not be built.
pub(crate) fn classify_error(err: &reqwest::Error) -> Disposition {
    match err.status() {
        Some(status) => classify_status(status.as_u16()),
        None if err.is_builder() => Disposition::Return,
        None => Disposition::Retry,
    }
}

/// Classify one attempt.
pub(crate) fn classify(outcome: &Result<reqwest::Response, reqwest::Error>) -> Disposition {
    match outcome {
        Ok(response) => classify_status(response.status().as_u16()),
        Err(err) => classify_error(err),
    }
}
