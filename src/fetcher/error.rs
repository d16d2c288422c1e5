// src/fetcher/error.rs
// =============================================================================
// FetchError: every way a single page fetch can fail.
//
// reqwest errors are sorted into these variants in one place, so the
// frontier and the `page` command see the same categories.
// =============================================================================

use thiserror::Error;

/// Why a page could not be turned into a PageRecord
///
/// None of these stop a crawl: the frontier treats every variant as
/// "no content, no links" for that URL.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request exceeded its timeout
    #[error("request timed out")]
    Timeout,

    /// Connection could not be established (DNS, refused, reset)
    #[error("connection failed: {0}")]
    Connect(String),

    /// Redirect loop or too many hops
    #[error("too many redirects")]
    Redirect,

    /// Server answered with a non-success status
    #[error("HTTP {0}")]
    Status(u16),

    /// Body is not text (image, archive, ...)
    #[error("non-text response: {0}")]
    NotText(String),

    /// Body was empty or whitespace only
    #[error("empty response body")]
    EmptyBody,

    /// Anything else reqwest reported
    #[error("request failed: {0}")]
    Request(String),
}

// Categorizes reqwest errors the same way for every request:
// timeout first, then redirects, then connection problems.
impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_redirect() {
            FetchError::Redirect
        } else if error.is_connect() {
            FetchError::Connect(error.to_string())
        } else if let Some(status) = error.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Request(error.to_string())
        }
    }
}
