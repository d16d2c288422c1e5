// src/output/markdown.rs
// =============================================================================
// This module turns a fetched page into Markdown text.
//
// We use two crates:
// - `htmd` converts HTML to Markdown (headings, lists, tables, fenced code)
// - `pulldown-cmark` parses the result back into events, which is the
//   easy way to find the first heading of a page
//
// Script, style and head blocks never reach the output.
// =============================================================================

use htmd::HtmlToMarkdown;
use pulldown_cmark::{Event, Parser, Tag};
use scraper::Html;
use tracing::warn;

/// Tags whose contents are dropped entirely
const SKIPPED_TAGS: [&str; 4] = ["script", "style", "noscript", "head"];

// Converts raw HTML into Markdown
//
// If the converter fails we fall back to the page's plain text, so a page
// is never lost because of odd markup.
pub fn to_markdown(raw_html: &str) -> String {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();

    let markdown = match converter.convert(raw_html) {
        Ok(markdown) => markdown,
        Err(e) => {
            warn!(error = %e, "HTML to Markdown conversion failed, using plain text");
            Html::parse_document(raw_html)
                .root_element()
                .text()
                .collect::<String>()
        }
    };

    tidy(&markdown)
}

// Trims trailing spaces and collapses runs of blank lines into one
fn tidy(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut blank_run = 0;

    for line in markdown.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}

// Returns the text of the first heading in a Markdown document
//
// Example:
//   "intro\n\n## Install `cargo`\n" -> Some("Install cargo")
pub fn first_heading(markdown: &str) -> Option<String> {
    let mut in_heading = false;
    let mut text = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading(..)) => {
                in_heading = true;
                text.clear();
            }
            Event::End(Tag::Heading(..)) => {
                let heading = text.trim();
                if !heading.is_empty() {
                    return Some(heading.to_string());
                }
                in_heading = false;
            }
            Event::Text(t) | Event::Code(t) if in_heading => text.push_str(&t),
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_script_and_style() {
        let html = r#"
            <html><head><title>Ignored</title><style>body { color: red }</style></head>
            <body>
              <h1>Guide</h1>
              <script>alert("hi")</script>
              <p>Hello <strong>docs</strong></p>
            </body></html>
        "#;
        let markdown = to_markdown(html);
        assert!(markdown.contains("Guide"));
        assert!(markdown.contains("**docs**"));
        assert!(!markdown.contains("alert"));
        assert!(!markdown.contains("color: red"));
        assert!(!markdown.contains("Ignored"));
    }

    #[test]
    fn test_code_block_is_kept() {
        let html = "<body><pre><code>cargo build</code></pre></body>";
        let markdown = to_markdown(html);
        assert!(markdown.contains("cargo build"));
    }

    #[test]
    fn test_tidy_collapses_blank_lines() {
        assert_eq!(tidy("a  \n\n\n\nb\n\n"), "a\n\nb");
    }

    #[test]
    fn test_first_heading() {
        assert_eq!(
            first_heading("intro text\n\n## Install `cargo`\n\nbody"),
            Some("Install cargo".to_string())
        );
        assert_eq!(first_heading("# \n\n# Second\n"), Some("Second".to_string()));
        assert_eq!(first_heading("no headings here"), None);
    }
}
