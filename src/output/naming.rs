// src/output/naming.rs
// =============================================================================
// Filesystem-safe names, folder keys and anchors for pages.
//
// Name priority for a page file:
//   1. slug of the page title
//   2. slug of the last URL path segment (extension dropped)
//   3. positional fallback: page-001, page-002, ...
// =============================================================================

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Folder used for pages that sit at the top of the site
pub const GENERAL_FOLDER: &str = "general";

/// Longest slug we produce
const MAX_SLUG_LEN: usize = 80;

// Lowercases and keeps only [a-z0-9], joining everything else with '-'
//
// Examples:
//   "Getting Started!" -> "getting-started"
//   "  API / Reference " -> "api-reference"
//   "***" -> ""
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }

    slug.trim_end_matches('-').to_string()
}

// The last non-empty path segment of a URL, without its extension
fn url_tail(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()?
        .to_string();

    let stem = match segment.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => segment,
    };
    Some(stem)
}

// Base file name (no extension) for a page
//
// `position` is the page's zero-based index in the sorted collection and is
// only used when neither the title nor the URL gives a usable name.
pub fn page_stem(title: Option<&str>, url: &str, position: usize) -> String {
    let from_title = title.map(slugify).filter(|slug| !slug.is_empty());
    let from_url = || url_tail(url).map(|tail| slugify(&tail)).filter(|slug| !slug.is_empty());

    from_title
        .or_else(from_url)
        .unwrap_or_else(|| format!("page-{:03}", position + 1))
}

// Folder a page belongs to in split layouts
//
// Pages under a section (/guide/install) go to that section's folder
// ("guide"); pages at the top of the site (/, /about) go to "general".
pub fn folder_key(url: &str) -> String {
    let segments: Vec<String> = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .map(|segments| segments.filter(|s| !s.is_empty()).map(str::to_string).collect())
        })
        .unwrap_or_default();

    if segments.len() < 2 {
        return GENERAL_FOLDER.to_string();
    }

    let slug = slugify(&segments[0]);
    if slug.is_empty() {
        GENERAL_FOLDER.to_string()
    } else {
        slug
    }
}

// Content-addressed anchor for a page: "page-" + 8 hex chars of SHA-256(url)
pub fn anchor(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hex: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    format!("page-{}", hex)
}

/// Hands out unique names per folder, suffixing -2, -3, ... on collision
#[derive(Debug, Default)]
pub struct NameRegistry {
    taken: HashMap<String, HashSet<String>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a name in a folder so it's never handed out
    pub fn reserve(&mut self, folder: &str, name: &str) {
        self.taken
            .entry(folder.to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub fn claim(&mut self, folder: &str, stem: &str) -> String {
        let taken = self.taken.entry(folder.to_string()).or_default();

        let mut candidate = stem.to_string();
        let mut n = 2;
        while taken.contains(&candidate) {
            candidate = format!("{}-{}", stem, n);
            n += 1;
        }
        taken.insert(candidate.clone());
        candidate
    }
}
