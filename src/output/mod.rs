// src/output/mod.rs
// =============================================================================
// This module assembles crawled pages into Markdown documents on disk.
//
// Layouts:
// - combined: one documentation.md with front-matter and a table of contents
// - per-page-in-subdirectory: index.md plus one file per page, in a folder
//   per site section
// - per-page-flat: index.md plus one file per page, all side by side
//
// Every page gets a content-addressed anchor and a source citation. Pages
// are always written in URL order, whatever order the crawl finished in.
//
// Submodules:
// - markdown: HTML -> Markdown conversion and heading lookup
// - naming: slugs, folder keys, anchors and collision-free file names
// =============================================================================

mod markdown;
mod naming;

pub use markdown::to_markdown;

use crate::crawl::PageRecord;
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::ValueEnum;
use markdown::first_heading;
use naming::{anchor, folder_key, page_stem, NameRegistry};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// File name of the single document in combined layout
pub const COMBINED_FILE: &str = "documentation.md";
/// File name of the index in split layouts
pub const INDEX_FILE: &str = "index.md";

/// How pages are partitioned into files
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutMode {
    /// One document with every page and a table of contents
    Combined,
    /// An index plus one file per page, grouped into section folders
    #[value(name = "per-page-in-subdirectory", alias = "split")]
    PerPageInSubdirectory,
    /// An index plus one file per page, all in the output directory
    #[value(name = "per-page-flat", alias = "flat")]
    PerPageFlat,
}

// A page ready to be written
struct RenderedPage {
    url: String,
    // Display title: page title, else first heading, else the URL
    title: String,
    // Title or heading only, used for file names
    name_hint: Option<String>,
    anchor: String,
    folder: String,
    body: String,
}

// Writes the pages to `out_dir` using the given layout
//
// Parameters:
//   pages: every record the crawl produced (any order)
//   out_dir: output directory, created if missing
//   layout: combined or one of the split layouts
//   source: the seed URL, cited in the front-matter
//
// Returns: paths of every file written
pub fn write_documents(
    pages: Vec<PageRecord>,
    out_dir: &Path,
    layout: LayoutMode,
    source: &str,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let rendered = render(pages);
    let doc_title = document_title(source);
    let generated = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let written = match layout {
        LayoutMode::Combined => {
            write_combined(&rendered, out_dir, &doc_title, source, &generated)?
        }
        LayoutMode::PerPageInSubdirectory => {
            write_split(&rendered, out_dir, &doc_title, source, &generated, true)?
        }
        LayoutMode::PerPageFlat => {
            write_split(&rendered, out_dir, &doc_title, source, &generated, false)?
        }
    };

    info!(
        files = written.len(),
        pages = rendered.len(),
        layout = ?layout,
        dir = %out_dir.display(),
        "Wrote documents"
    );
    Ok(written)
}

// Sorts by URL and converts every page body to Markdown
fn render(mut pages: Vec<PageRecord>) -> Vec<RenderedPage> {
    pages.sort_by(|a, b| a.url.cmp(&b.url));

    pages
        .into_iter()
        .map(|page| {
            // The synthetic error record is already plain text
            let body = if page.is_failure() {
                page.content.clone()
            } else {
                to_markdown(&page.content)
            };

            let name_hint = page
                .title
                .clone()
                .filter(|title| !title.trim().is_empty())
                .or_else(|| first_heading(&body));
            let title = name_hint.clone().unwrap_or_else(|| page.url.clone());

            RenderedPage {
                anchor: anchor(&page.url),
                folder: folder_key(&page.url),
                url: page.url,
                title,
                name_hint,
                body,
            }
        })
        .collect()
}

fn document_title(source: &str) -> String {
    let host = Url::parse(source)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| source.to_string());
    format!("Documentation: {}", host)
}

// Double-quoted scalar safe for YAML front-matter (JSON strings are valid
// YAML flow scalars)
fn quoted(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

// Markdown link text can't contain unescaped brackets
fn link_text(title: &str) -> String {
    title.replace('[', "\\[").replace(']', "\\]")
}

fn page_section(page: &RenderedPage, heading: &str) -> String {
    format!(
        "<a id=\"{}\"></a>\n\n{} {}\n\n> Source: <{}>\n\n{}\n",
        page.anchor, heading, page.title, page.url, page.body
    )
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), bytes = contents.len(), "Wrote file");
    Ok(())
}

fn write_combined(
    pages: &[RenderedPage],
    out_dir: &Path,
    doc_title: &str,
    source: &str,
    generated: &str,
) -> Result<Vec<PathBuf>> {
    let mut doc = String::new();

    doc.push_str("---\n");
    doc.push_str(&format!("title: {}\n", quoted(doc_title)));
    doc.push_str(&format!("source: {}\n", quoted(source)));
    doc.push_str(&format!("generated: {}\n", quoted(generated)));
    doc.push_str(&format!("pages: {}\n", pages.len()));
    doc.push_str("---\n\n");

    doc.push_str(&format!("# {}\n\n", doc_title));
    doc.push_str("## Table of Contents\n\n");
    for (i, page) in pages.iter().enumerate() {
        doc.push_str(&format!(
            "{}. [{}](#{})\n",
            i + 1,
            link_text(&page.title),
            page.anchor
        ));
    }

    for page in pages {
        doc.push_str("\n---\n\n");
        doc.push_str(&page_section(page, "##"));
    }

    let path = out_dir.join(COMBINED_FILE);
    write_file(&path, &doc)?;
    Ok(vec![path])
}

fn write_split(
    pages: &[RenderedPage],
    out_dir: &Path,
    doc_title: &str,
    source: &str,
    generated: &str,
    subdirectories: bool,
) -> Result<Vec<PathBuf>> {
    let mut names = NameRegistry::new();
    names.reserve("", "index");

    let mut written = Vec::with_capacity(pages.len() + 1);
    // folder -> [(title, relative path)], sorted by folder name
    let mut sections: BTreeMap<&str, Vec<(&str, String)>> = BTreeMap::new();

    for (position, page) in pages.iter().enumerate() {
        let stem = page_stem(page.name_hint.as_deref(), &page.url, position);
        let relative = if subdirectories {
            let name = names.claim(&page.folder, &stem);
            format!("{}/{}.md", page.folder, name)
        } else {
            let name = names.claim("", &stem);
            format!("{}.md", name)
        };

        let contents = format!(
            "---\ntitle: {}\nsource: {}\n---\n\n{}",
            quoted(&page.title),
            quoted(&page.url),
            page_section(page, "#")
        );
        let path = out_dir.join(&relative);
        write_file(&path, &contents)?;
        written.push(path);

        sections
            .entry(page.folder.as_str())
            .or_default()
            .push((page.title.as_str(), relative));
    }

    let mut index = String::new();
    index.push_str("---\n");
    index.push_str(&format!("title: {}\n", quoted(doc_title)));
    index.push_str(&format!("source: {}\n", quoted(source)));
    index.push_str(&format!("generated: {}\n", quoted(generated)));
    index.push_str(&format!("pages: {}\n", pages.len()));
    index.push_str("---\n\n");
    index.push_str(&format!("# {}\n", doc_title));

    for (folder, entries) in &sections {
        index.push_str(&format!("\n## {}\n\n", folder));
        for (title, relative) in entries {
            index.push_str(&format!("- [{}]({})\n", link_text(title), relative));
        }
    }

    let index_path = out_dir.join(INDEX_FILE);
    write_file(&index_path, &index)?;
    written.push(index_path);

    Ok(written)
}
