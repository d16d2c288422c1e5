// src/fetcher/mod.rs
// =============================================================================
// This module turns a URL into a PageRecord.
//
// Submodules:
// - http: performs the GET with a timeout and validates the response
// - html: extracts the title and the outbound links from the markup
// - error: the FetchError taxonomy
// =============================================================================

mod error;
mod html;
mod http;

pub use error::FetchError;
pub use http::Fetcher;
