// src/crawl/policy.rs
// =============================================================================
// The crawl policy: every knob that bounds a single crawl run.
//
// A policy is built once (from the command line), validated before any
// network activity, and then only read. Invalid values are a fatal startup
// error, never a crawl failure.
// =============================================================================

use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default number of concurrent fetch workers
pub const DEFAULT_CONCURRENCY: usize = 5;
/// Default cap on URLs dispatched in one run
pub const DEFAULT_MAX_URLS: usize = 200;
/// Default per-request timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
/// Default wall-clock budget for a run in milliseconds
pub const DEFAULT_MAX_RUN_TIME_MS: u64 = 30_000;

/// Errors raised while validating a policy or a seed URL
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("concurrency must be greater than 0, got {0}")]
    Concurrency(usize),

    #[error("max URLs per run must be greater than 0, got {0}")]
    MaxUrls(usize),

    #[error("request timeout must be greater than 0 ms, got {0}")]
    RequestTimeout(u64),

    #[error("max run time must be greater than 0 ms, got {0}")]
    MaxRunTime(u64),

    #[error("{kind} prefixes must not be empty")]
    EmptyPrefix { kind: &'static str },

    #[error("output directory must not be empty")]
    OutputDir,

    #[error("invalid seed URL '{url}': {reason}")]
    InvalidSeed { url: String, reason: String },
}

// Configuration for one crawl run
//
// Immutable once the run starts - the Frontier only ever borrows it.
#[derive(Debug, Clone)]
pub struct CrawlPolicy {
    /// Number of fetch workers running at once
    pub concurrency: usize,
    /// Only follow links whose host equals the seed's host
    pub same_domain: bool,
    /// Maximum number of URLs dispatched (claimed for fetching) per run
    pub max_urls: usize,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Wall-clock budget for the whole run in milliseconds
    pub max_run_time_ms: u64,
    /// When non-empty, a link must start with one of these prefixes
    pub allowed_prefixes: Vec<String>,
    /// A link starting with any of these prefixes is rejected
    pub denied_prefixes: Vec<String>,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            same_domain: true,
            max_urls: DEFAULT_MAX_URLS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_run_time_ms: DEFAULT_MAX_RUN_TIME_MS,
            allowed_prefixes: Vec::new(),
            denied_prefixes: Vec::new(),
        }
    }
}

impl CrawlPolicy {
    /// Checks every numeric field is positive and every prefix is non-empty
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.concurrency == 0 {
            return Err(PolicyError::Concurrency(self.concurrency));
        }
        if self.max_urls == 0 {
            return Err(PolicyError::MaxUrls(self.max_urls));
        }
        if self.request_timeout_ms == 0 {
            return Err(PolicyError::RequestTimeout(self.request_timeout_ms));
        }
        if self.max_run_time_ms == 0 {
            return Err(PolicyError::MaxRunTime(self.max_run_time_ms));
        }
        if self.allowed_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(PolicyError::EmptyPrefix { kind: "allowed" });
        }
        if self.denied_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(PolicyError::EmptyPrefix { kind: "denied" });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn max_run_time(&self) -> Duration {
        Duration::from_millis(self.max_run_time_ms)
    }
}

// Parses the seed URL and checks it can anchor a crawl
//
// The seed must be absolute, http or https, and have a host - that host
// becomes the domain anchor for the whole run.
pub fn parse_seed(seed: &str) -> Result<Url, PolicyError> {
    let invalid = |reason: String| PolicyError::InvalidSeed {
        url: seed.to_string(),
        reason,
    };

    let url = Url::parse(seed).map_err(|e| invalid(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("URL has no host".to_string()));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        let policy = CrawlPolicy::default();
        assert_eq!(policy.max_urls, 200);
        assert_eq!(policy.request_timeout_ms, 5_000);
        assert_eq!(policy.max_run_time_ms, 30_000);
        assert!(policy.same_domain);
        assert_eq!(policy.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_values() {
        let zero_workers = CrawlPolicy {
            concurrency: 0,
            ..CrawlPolicy::default()
        };
        assert_eq!(zero_workers.validate(), Err(PolicyError::Concurrency(0)));

        let zero_budget = CrawlPolicy {
            max_urls: 0,
            ..CrawlPolicy::default()
        };
        assert_eq!(zero_budget.validate(), Err(PolicyError::MaxUrls(0)));

        let zero_timeout = CrawlPolicy {
            request_timeout_ms: 0,
            ..CrawlPolicy::default()
        };
        assert_eq!(zero_timeout.validate(), Err(PolicyError::RequestTimeout(0)));

        let zero_run_time = CrawlPolicy {
            max_run_time_ms: 0,
            ..CrawlPolicy::default()
        };
        assert_eq!(zero_run_time.validate(), Err(PolicyError::MaxRunTime(0)));
    }

    #[test]
    fn test_rejects_blank_prefix() {
        let policy = CrawlPolicy {
            denied_prefixes: vec!["  ".to_string()],
            ..CrawlPolicy::default()
        };
        assert_eq!(
            policy.validate(),
            Err(PolicyError::EmptyPrefix { kind: "denied" })
        );
    }

    #[test]
    fn test_parse_seed() {
        let url = parse_seed("https://docs.example.com/start").unwrap();
        assert_eq!(url.host_str(), Some("docs.example.com"));

        assert!(parse_seed("not a url").is_err());
        assert!(parse_seed("/relative/path").is_err());
        assert!(parse_seed("ftp://example.com/file").is_err());
        assert!(parse_seed("mailto:someone@example.com").is_err());
    }
}
