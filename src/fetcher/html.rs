// src/fetcher/html.rs
// =============================================================================
// This module pulls the title and links out of an HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// We also use the `url` crate to resolve relative hrefs against the page
// they were found on.
//
// Malformed hrefs are dropped here. They are never an error.
// =============================================================================

use scraper::{Html, Selector};
use url::Url;

/// What the crawler needs from a page's markup
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedHtml {
    /// Trimmed <title> text, None when missing or blank
    pub title: Option<String>,
    /// Raw href values of every <a href>, in document order
    pub anchor_hrefs: Vec<String>,
}

// Parses raw HTML into its title and anchor hrefs
//
// Example:
//   html = "<title> Intro </title><a href='/docs'>Docs</a>"
//   result = ParsedHtml { title: Some("Intro"), anchor_hrefs: ["/docs"] }
pub fn parse(raw_html: &str) -> ParsedHtml {
    let document = Html::parse_document(raw_html);

    ParsedHtml {
        title: extract_title(&document),
        anchor_hrefs: extract_hrefs(&document),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

fn extract_hrefs(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

// Resolves every href to an absolute URL against the page's own URL
//
// Parameters:
//   hrefs: raw href values (might be relative, might be absolute)
//   page_url: the URL of the page they came from
//
// Returns: absolute URLs, in the same order, with unusable hrefs dropped
pub fn resolve_links(hrefs: &[String], page_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };

    hrefs
        .iter()
        .filter_map(|href| resolve_url(&base, href))
        .collect()
}

// Resolves a possibly-relative URL to an absolute URL
//
// Examples:
//   base = "https://example.com/page"
//   href = "/docs" -> Some("https://example.com/docs")
//   href = "../other" -> Some("https://example.com/other")
//   href = "https://other.com" -> Some("https://other.com/")
//   href = "#section" -> None (same page)
//   href = "javascript:void(0)" -> None
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    if href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
        || href.starts_with("data:")
    {
        return None;
    }

    // Absolute hrefs parse on their own; relative ones need the base
    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(_) => base.join(href).ok().map(|url| url.to_string()),
    }
}
