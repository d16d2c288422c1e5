// src/crawl/mod.rs
// =============================================================================
// This module handles crawling a documentation site.
//
// Features:
// - Concurrent crawling from a seed URL with a fixed pool of workers
// - Same-domain restriction, allow/deny prefixes, extension and query filters
// - URL and wall-clock budgets, so every run terminates
// - A visited set that never fetches a URL twice
//
// Submodules:
// - policy: the CrawlPolicy and its validation
// - visited: URL normalization and the visited set
// - filter: the link filter
// - record: PageRecord, the output of one successful fetch
// - frontier: the crawl engine tying everything together
// =============================================================================

mod filter;
mod frontier;
mod policy;
mod record;
mod visited;

pub use filter::admit;
pub use frontier::{CrawlReport, Frontier, StopReason};
pub use policy::{
    parse_seed, CrawlPolicy, PolicyError, DEFAULT_CONCURRENCY, DEFAULT_MAX_RUN_TIME_MS,
    DEFAULT_MAX_URLS, DEFAULT_REQUEST_TIMEOUT_MS,
};
pub use record::PageRecord;
