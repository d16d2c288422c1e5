// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Every crawl knob has a default, so `doc-harvest crawl <URL>` is enough to
// get a combined document in ./docs-out.
// =============================================================================

use crate::crawl::{
    CrawlPolicy, DEFAULT_CONCURRENCY, DEFAULT_MAX_RUN_TIME_MS, DEFAULT_MAX_URLS,
    DEFAULT_REQUEST_TIMEOUT_MS,
};
use crate::output::LayoutMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// This struct represents our entire CLI application
#[derive(Parser, Debug)]
#[command(
    name = "doc-harvest",
    version,
    about = "Crawl a documentation site and assemble it into Markdown",
    long_about = "doc-harvest crawls a documentation website from a seed URL, stays within \
                  the limits you set (domain, prefixes, URL count, run time) and writes the \
                  pages out as one combined Markdown document or one file per page."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a site and write the harvested pages as Markdown
    ///
    /// Example: doc-harvest crawl https://docs.example.com/start --layout per-page-flat
    Crawl(CrawlArgs),

    /// Fetch a single page and print its title, links and Markdown
    ///
    /// Example: doc-harvest page https://docs.example.com/start
    Page {
        /// Page URL (absolute, http or https)
        url: String,

        /// Request timeout in milliseconds
        #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
        timeout_ms: u64,
    },
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Seed URL to start crawling from (absolute, http or https)
    pub seed_url: String,

    /// Directory the Markdown files are written to
    #[arg(short, long, default_value = "docs-out")]
    pub output: PathBuf,

    /// How pages are split into files
    #[arg(long, value_enum, default_value_t = LayoutMode::Combined)]
    pub layout: LayoutMode,

    /// Number of pages fetched at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Follow links to other hosts too (default: seed host only)
    #[arg(long)]
    pub any_domain: bool,

    /// Maximum number of URLs fetched in one run
    #[arg(long, default_value_t = DEFAULT_MAX_URLS)]
    pub max_urls: usize,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Maximum wall-clock time for the crawl in milliseconds
    #[arg(long, default_value_t = DEFAULT_MAX_RUN_TIME_MS)]
    pub max_run_time_ms: u64,

    /// Only follow links starting with this prefix (repeatable)
    #[arg(long = "allow", value_name = "PREFIX")]
    pub allowed_prefixes: Vec<String>,

    /// Never follow links starting with this prefix (repeatable)
    #[arg(long = "deny", value_name = "PREFIX")]
    pub denied_prefixes: Vec<String>,

    /// Print the run summary as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl CrawlArgs {
    /// Builds the crawl policy these arguments describe
    pub fn policy(&self) -> CrawlPolicy {
        CrawlPolicy {
            concurrency: self.concurrency,
            same_domain: !self.any_domain,
            max_urls: self.max_urls,
            request_timeout_ms: self.timeout_ms,
            max_run_time_ms: self.max_run_time_ms,
            allowed_prefixes: self.allowed_prefixes.clone(),
            denied_prefixes: self.denied_prefixes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_crawl_defaults() {
        let cli = Cli::try_parse_from(["doc-harvest", "crawl", "https://ex.com/docs"]).unwrap();
        let Commands::Crawl(args) = cli.command else {
            panic!("expected crawl subcommand");
        };

        assert_eq!(args.output, PathBuf::from("docs-out"));
        assert_eq!(args.layout, LayoutMode::Combined);

        let policy = args.policy();
        assert_eq!(policy.concurrency, 5);
        assert!(policy.same_domain);
        assert_eq!(policy.max_urls, 200);
        assert_eq!(policy.request_timeout_ms, 5_000);
        assert_eq!(policy.max_run_time_ms, 30_000);
        assert!(policy.allowed_prefixes.is_empty());
    }

    #[test]
    fn test_crawl_flags() {
        let cli = Cli::try_parse_from([
            "doc-harvest",
            "crawl",
            "https://ex.com/docs/start",
            "-o",
            "out",
            "--layout",
            "per-page-in-subdirectory",
            "--any-domain",
            "--max-urls",
            "50",
            "--allow",
            "https://ex.com/docs/",
            "--deny",
            "https://ex.com/docs/v1/",
            "--deny",
            "https://ex.com/docs/v2/",
        ])
        .unwrap();
        let Commands::Crawl(args) = cli.command else {
            panic!("expected crawl subcommand");
        };

        assert_eq!(args.layout, LayoutMode::PerPageInSubdirectory);
        let policy = args.policy();
        assert!(!policy.same_domain);
        assert_eq!(policy.max_urls, 50);
        assert_eq!(policy.allowed_prefixes, vec!["https://ex.com/docs/"]);
        assert_eq!(policy.denied_prefixes.len(), 2);
    }

    #[test]
    fn test_layout_aliases() {
        let cli =
            Cli::try_parse_from(["doc-harvest", "crawl", "https://ex.com", "--layout", "flat"])
                .unwrap();
        let Commands::Crawl(args) = cli.command else {
            panic!("expected crawl subcommand");
        };
        assert_eq!(args.layout, LayoutMode::PerPageFlat);
    }
}
