// src/fetcher/http.rs
// =============================================================================
// This module fetches one page over HTTP and turns it into a PageRecord.
//
// Key functionality:
// - One GET per URL, with a descriptive User-Agent
// - A per-request timeout covering connect, headers and body
// - Rejects non-success statuses, non-text bodies and empty bodies
// - Hands the body to the HTML parser for the title and links
//
// A fetch never panics and never stops the crawl. Every failure comes back
// as a FetchError, which the frontier treats as "zero links, no record".
// There are no retries: one attempt per URL.
// =============================================================================

use super::FetchError;
use super::html;
use crate::crawl::PageRecord;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// User-Agent sent with every request
pub fn user_agent() -> String {
    format!(
        "doc-harvest/{} (documentation crawler)",
        env!("CARGO_PKG_VERSION")
    )
}

/// HTTP fetcher shared by every crawl worker
///
/// Client is cheap to clone (it's a reference counter internally), so
/// each worker gets its own copy of the fetcher.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Builds the HTTP client used for every request in a run
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    // Fetches one page
    //
    // Parameters:
    //   url: absolute URL to GET
    //   timeout: upper bound for the whole request, body included
    //
    // Returns: a PageRecord whose links are absolute and resolved against
    // the URL the page was finally served from (after redirects), or the
    // reason the page is unusable. The record keeps `url` as its identity.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<PageRecord, FetchError> {
        let response = self.client.get(url).timeout(timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            if !is_text_content(content_type) {
                return Err(FetchError::NotText(content_type.to_string()));
            }
        }

        // Relative hrefs belong to wherever the redirects ended up
        let final_url = response.url().clone();
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        let parsed = html::parse(&body);
        let links = html::resolve_links(&parsed.anchor_hrefs, final_url.as_str());
        debug!(url, served_from = %final_url, links = links.len(), "Fetched page");

        Ok(PageRecord {
            url: url.to_string(),
            content: body,
            links,
            title: parsed.title,
        })
    }
}

// Checks whether a Content-Type header describes a text document
//
// text/* and the XML flavours of HTML count as text. Everything else
// (images, PDFs, archives, JSON blobs) does not.
fn is_text_content(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime.starts_with("text/") || mime == "application/xhtml+xml" || mime == "application/xml"
}
