// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (tracing, to stderr, filtered by RUST_LOG)
// 2. Parse command-line arguments using clap
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = success, 1 = seed could not be fetched,
//    2 = error such as an invalid policy or an unwritable output directory)
//
// Rust concepts used:
// - async/await: the crawl runs many requests concurrently
// - Result<T, E>: for error handling (T = success type, E = error type)
// - match: pattern matching to handle different subcommands
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli; // src/cli.rs - command-line parsing
mod crawl; // src/crawl/ - the crawl engine
mod fetcher; // src/fetcher/ - HTTP fetching and HTML parsing
mod output; // src/output/ - Markdown conversion and document layout

use anyhow::Result;
use clap::Parser; // Parser trait enables the parse() method
use cli::{Cli, Commands, CrawlArgs};
use crawl::{CrawlPolicy, CrawlReport, Frontier, PolicyError, StopReason};
use fetcher::Fetcher;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Width of the URL column in the results table
const URL_COLUMN: usize = 60;

#[tokio::main]
async fn main() {
    init_tracing();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // Invalid configuration or I/O trouble: print it and exit with code 2
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so stdout stays clean for --json output
// Default level: info for this crate, overridable with RUST_LOG
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "doc_harvest=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// Returns:
//   Ok(0) = crawl finished and documents were written
//   Ok(1) = the seed (or the single page) could not be fetched
//   Err = invalid configuration or I/O failure (exit code 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(args) => handle_crawl(&args).await,
        Commands::Page { url, timeout_ms } => handle_page(&url, timeout_ms).await,
    }
}

// What --json prints: the run outcome plus one entry per page
#[derive(Debug, Serialize)]
struct CrawlSummary {
    seed: String,
    stop_reason: StopReason,
    dispatched: usize,
    discarded: usize,
    failed: usize,
    elapsed_ms: u64,
    output_dir: PathBuf,
    files: Vec<PathBuf>,
    pages: Vec<PageSummary>,
}

#[derive(Debug, Serialize)]
struct PageSummary {
    url: String,
    title: Option<String>,
    links: usize,
    failed: bool,
}

impl CrawlSummary {
    fn new(seed: &str, report: &CrawlReport, output_dir: PathBuf) -> Self {
        let mut pages: Vec<PageSummary> = report
            .pages
            .iter()
            .map(|page| PageSummary {
                url: page.url.clone(),
                title: page.title.clone(),
                links: page.links.len(),
                failed: page.is_failure(),
            })
            .collect();
        pages.sort_by(|a, b| a.url.cmp(&b.url));

        Self {
            seed: seed.to_string(),
            stop_reason: report.stop_reason,
            dispatched: report.dispatched,
            discarded: report.discarded,
            failed: pages.iter().filter(|p| p.failed).count(),
            elapsed_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            output_dir,
            files: Vec::new(),
            pages,
        }
    }
}

// Handles the 'crawl' subcommand
//
// Everything that can be checked up front (policy, seed, output path) is
// checked before the first request goes out.
async fn handle_crawl(args: &CrawlArgs) -> Result<i32> {
    let policy = args.policy();
    policy.validate()?;
    crawl::parse_seed(&args.seed_url)?;
    if args.output.as_os_str().is_empty() {
        return Err(PolicyError::OutputDir.into());
    }

    let frontier = Frontier::new(policy, Fetcher::new()?)?;

    if !args.json {
        let policy = frontier.policy();
        println!("🔍 Crawling: {}", args.seed_url);
        println!(
            "📊 Budget: {} URL(s), {} ms, {} worker(s)",
            policy.max_urls, policy.max_run_time_ms, policy.concurrency
        );
    }

    let report = frontier.crawl(&args.seed_url).await?;
    let mut summary = CrawlSummary::new(&args.seed_url, &report, args.output.clone());

    summary.files =
        output::write_documents(report.pages, &args.output, args.layout, &args.seed_url)?;

    print_results(&summary, args.json)?;

    if summary.stop_reason == StopReason::SeedFailed {
        Ok(1) // Exit code 1 = nothing could be harvested
    } else {
        Ok(0)
    }
}

// Handles the 'page' subcommand: one fetch, no crawl, nothing written
async fn handle_page(url: &str, timeout_ms: u64) -> Result<i32> {
    let page_url = crawl::parse_seed(url)?;
    let policy = CrawlPolicy {
        request_timeout_ms: timeout_ms,
        ..CrawlPolicy::default()
    };
    policy.validate()?;

    let fetcher = Fetcher::new()?;
    let page = match fetcher.fetch(page_url.as_str(), policy.request_timeout()).await {
        Ok(page) => page,
        Err(e) => {
            eprintln!("❌ Failed to fetch {}: {}", url, e);
            return Ok(1);
        }
    };

    let host = page_url.host_str().unwrap_or_default();

    println!("📄 {}", page.title.as_deref().unwrap_or("(untitled)"));
    println!("🔗 {} link(s):", page.links.len());
    for link in &page.links {
        // Same verdict the crawler would give for a crawl seeded here
        let mark = if crawl::admit(link, &page.url, host, &policy) {
            "✅"
        } else {
            "⏭️ "
        };
        println!("   {} {}", mark, link);
    }
    println!();
    println!("{}", output::to_markdown(&page.content));

    Ok(0)
}

// Prints the run summary either as a table or JSON
fn print_results(summary: &CrawlSummary, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(summary)?;
        println!("{}", json_output);
    } else {
        print_table(summary);
    }
    Ok(())
}

// Prints the harvested pages as a human-readable table in the terminal
fn print_table(summary: &CrawlSummary) {
    println!();
    println!("{:<60} {:<8} {:<30}", "URL", "LINKS", "TITLE");
    println!("{}", "=".repeat(100));

    for page in &summary.pages {
        // Truncate URL if too long for display
        let url_display = if page.url.chars().count() > URL_COLUMN - 3 {
            let cut: String = page.url.chars().take(URL_COLUMN - 3).collect();
            format!("{}...", cut)
        } else {
            page.url.clone()
        };
        let title = if page.failed {
            "❌ failed".to_string()
        } else {
            page.title.clone().unwrap_or_default()
        };

        println!("{:<60} {:<8} {:<30}", url_display, page.links, title);
    }

    println!();
    println!("📊 Summary:");
    println!("   🛑 Stopped: {}", summary.stop_reason);
    println!("   📄 Pages: {}", summary.pages.len());
    println!("   🚀 Dispatched: {}", summary.dispatched);
    println!("   🗑️  Discarded: {}", summary.discarded);
    println!("   ❌ Failed: {}", summary.failed);
    println!("   ⏱️  Elapsed: {} ms", summary.elapsed_ms);
    println!(
        "   💾 Wrote {} file(s) to {}",
        summary.files.len(),
        summary.output_dir.display()
    );
}
