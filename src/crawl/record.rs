// src/crawl/record.rs
// =============================================================================
// PageRecord: the result of fetching one URL successfully.
//
// Records are created by the fetcher, appended to the frontier's result
// collection, and finally moved into the aggregator. They are never changed
// after creation.
// =============================================================================

use std::fmt::Display;

/// Title given to the synthetic record produced when the seed fails
pub const FAILURE_TITLE: &str = "Error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// Normalized URL (no query, no fragment)
    pub url: String,
    /// Raw response body
    pub content: String,
    /// Absolute outbound links in document order
    pub links: Vec<String>,
    /// Trimmed <title> text, if the page had one
    pub title: Option<String>,
}

impl PageRecord {
    // Builds the stand-in record used when the seed can't be fetched
    //
    // Downstream always has at least one page to render, and that page
    // explains what went wrong.
    pub fn failed(url: &str, error: impl Display) -> Self {
        Self {
            url: url.to_string(),
            content: format!("Failed to fetch {}: {}", url, error),
            links: Vec::new(),
            title: Some(FAILURE_TITLE.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.links.is_empty()
            && self.title.as_deref() == Some(FAILURE_TITLE)
            && self.content.starts_with("Failed to fetch ")
    }
}
