// src/crawl/filter.rs
// =============================================================================
// The link filter decides whether a discovered link may enter the frontier.
//
// It's a pure function of the link, the page it was found on, the run's
// domain anchor and the policy. Rules are applied in order and the first
// failing rule rejects the link:
//
// 1. must resolve to an absolute URL (relative links resolve against the
//    current page)
// 2. scheme must be http or https
// 3. same-domain policy: host must equal the domain anchor exactly
// 4. path must not end in a denied extension (.pdf, .png, ...)
// 5. query string must be at most 20 characters
// 6. allow-list: must start with at least one allowed prefix
// 7. deny-list: must not start with any denied prefix
//
// The fragment is stripped before any rule runs.
// =============================================================================

use crate::crawl::policy::CrawlPolicy;
use crate::crawl::visited::normalize_url;
use std::fmt;
use url::Url;

/// Extensions that never lead to documentation pages
const DENIED_EXTENSIONS: [&str; 8] = [".jpg", ".jpeg", ".png", ".gif", ".pdf", ".zip", ".css", ".js"];

/// Longest query string a link may carry
const MAX_QUERY_LEN: usize = 20;

/// Why a link was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Could not be resolved to an absolute URL
    Unparsable,
    /// Not http or https
    Scheme(String),
    /// Host differs from the domain anchor
    OffDomain(String),
    /// Path ends in a denied extension
    Extension(&'static str),
    /// Query string is longer than MAX_QUERY_LEN
    LongQuery(usize),
    /// No allowed prefix matched
    NotAllowed,
    /// A denied prefix matched
    Denied(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Unparsable => write!(f, "not a resolvable URL"),
            Rejection::Scheme(scheme) => write!(f, "unsupported scheme '{}'", scheme),
            Rejection::OffDomain(host) => write!(f, "off-domain host '{}'", host),
            Rejection::Extension(ext) => write!(f, "denied extension '{}'", ext),
            Rejection::LongQuery(len) => write!(f, "query string too long ({} chars)", len),
            Rejection::NotAllowed => write!(f, "no allowed prefix matched"),
            Rejection::Denied(prefix) => write!(f, "denied prefix '{}'", prefix),
        }
    }
}

// Screens one link against the policy
//
// Parameters:
//   link: the raw link as discovered (absolute or relative)
//   current_url: the page the link was found on
//   base_domain: the run's domain anchor (the seed's host)
//   policy: the crawl policy
//
// Returns: the normalized link (query and fragment stripped) ready to be
// queued, or the reason it was rejected
pub fn screen(
    link: &str,
    current_url: &str,
    base_domain: &str,
    policy: &CrawlPolicy,
) -> Result<String, Rejection> {
    // Rule 1: resolve against the current page
    let mut url = match Url::parse(link) {
        Ok(url) => url,
        Err(_) => Url::parse(current_url)
            .and_then(|base| base.join(link))
            .map_err(|_| Rejection::Unparsable)?,
    };
    url.set_fragment(None);

    // Rule 2
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Rejection::Scheme(url.scheme().to_string()));
    }

    // Rule 3
    if policy.same_domain && url.host_str() != Some(base_domain) {
        return Err(Rejection::OffDomain(
            url.host_str().unwrap_or_default().to_string(),
        ));
    }

    // Rule 4
    let path = url.path().to_ascii_lowercase();
    if let Some(ext) = DENIED_EXTENSIONS.iter().find(|ext| path.ends_with(**ext)) {
        return Err(Rejection::Extension(*ext));
    }

    // Rule 5
    if let Some(query) = url.query() {
        if query.len() > MAX_QUERY_LEN {
            return Err(Rejection::LongQuery(query.len()));
        }
    }

    let normalized = normalize_url(url.as_str());

    // Rule 6
    if !policy.allowed_prefixes.is_empty()
        && !policy
            .allowed_prefixes
            .iter()
            .any(|prefix| normalized.starts_with(prefix.as_str()))
    {
        return Err(Rejection::NotAllowed);
    }

    // Rule 7
    if let Some(prefix) = policy
        .denied_prefixes
        .iter()
        .find(|prefix| normalized.starts_with(prefix.as_str()))
    {
        return Err(Rejection::Denied(prefix.clone()));
    }

    Ok(normalized)
}

/// Boolean form of screen(): true when the link is admitted
pub fn admit(link: &str, current_url: &str, base_domain: &str, policy: &CrawlPolicy) -> bool {
    screen(link, current_url, base_domain, policy).is_ok()
}
