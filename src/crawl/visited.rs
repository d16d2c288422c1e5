// src/crawl/visited.rs
// =============================================================================
// The visited set: which URLs have already been claimed in this run.
//
// Two layers:
// - a Bloom filter (fixed capacity, fixed false-positive rate) answers
//   "definitely not seen" without touching the exact set
// - a HashSet holds the exact membership
//
// A positive answer from the Bloom filter counts as "visited" even when the
// exact set disagrees. Those false positives mean a page may be skipped, but
// a page is never fetched twice.
//
// Every check and insert goes through normalize_url(), so a URL that only
// differs by query string or fragment is the same entry.
// =============================================================================

use bloomfilter::Bloom;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// Number of items the Bloom filter is sized for
const BLOOM_CAPACITY: usize = 100_000;
/// Target false-positive rate at capacity
const BLOOM_FP_RATE: f64 = 0.001;

pub struct VisitedSet {
    exact: HashSet<String>,
    // None only if the filter could not be sized; the exact set still works
    bloom: Option<Bloom<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        let bloom = match Bloom::new_for_fp_rate(BLOOM_CAPACITY, BLOOM_FP_RATE) {
            Ok(bloom) => Some(bloom),
            Err(e) => {
                warn!("Failed to create Bloom filter, using exact set only: {e}");
                None
            }
        };

        Self {
            exact: HashSet::new(),
            bloom,
        }
    }

    /// Returns true if the URL (after normalization) was marked before
    pub fn is_visited(&self, url: &str) -> bool {
        let key = normalize_url(url);

        match &self.bloom {
            // Fast path: the filter has no false negatives
            Some(bloom) if !bloom.check(&key) => false,
            Some(_) => {
                if !self.exact.contains(&key) {
                    debug!(url = %key, "Bloom filter false positive, treating as visited");
                }
                true
            }
            None => self.exact.contains(&key),
        }
    }

    /// Marks the URL (after normalization) as visited
    pub fn mark_visited(&mut self, url: &str) {
        let key = normalize_url(url);
        if let Some(bloom) = self.bloom.as_mut() {
            bloom.set(&key);
        }
        self.exact.insert(key);
    }

    /// Number of distinct URLs marked so far
    pub fn len(&self) -> usize {
        self.exact.len()
    }
}

impl Default for VisitedSet {
    fn default() -> Self {
        Self::new()
    }
}

// Strips the query string and fragment from a URL
//
// Examples:
//   "https://ex.com/a?x=1#top" -> "https://ex.com/a"
//   "https://ex.com/a#top"     -> "https://ex.com/a"
//
// Strings that don't parse as URLs are cut at the first '?' or '#'.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => {
            let end = url.find(['?', '#']).unwrap_or(url.len());
            url[..end].to_string()
        }
    }
}
