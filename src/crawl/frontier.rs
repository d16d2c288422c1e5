// src/crawl/frontier.rs
// =============================================================================
// The frontier: a bounded-concurrency, self-terminating crawl of a site.
//
// How it works:
// 1. The seed is fetched first, on its own, before any worker exists
// 2. Links from every fetched page go through the link filter and, if not
//    yet visited, into a shared queue
// 3. A fixed pool of `concurrency` workers pulls URLs from the queue,
//    claims them, fetches them and feeds their links back in
// 4. The run stops when the queue runs dry, when the URL budget is spent,
//    or when the wall-clock budget runs out
//
// Engine states:
//   Running  -> Stopping  (URL budget reached, or run time exceeded)
//   Running  -> Stopped   (queue exhausted: nothing pending, nothing in flight)
//   Stopping -> Stopped   (in-flight fetches finished, queued tasks discarded)
//
// Once the engine leaves Running no task is claimed and nothing new is
// queued, so the crawl terminates even on an infinite or cyclic link graph.
//
// The claim step ("is it visited? mark it, bump the dispatch count") and
// the engine state sit behind one mutex, so two workers can never claim the
// same URL and the dispatch count never passes the budget.
// =============================================================================

use super::filter;
use super::policy::{parse_seed, CrawlPolicy, PolicyError};
use super::record::PageRecord;
use super::visited::{normalize_url, VisitedSet};
use crate::fetcher::Fetcher;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    Stopping,
    Stopped,
}

/// Why a crawl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No pending or in-flight tasks were left
    Exhausted,
    /// The dispatched-URL count reached the policy maximum
    UrlBudget,
    /// The maximum run time elapsed
    Deadline,
    /// The seed could not be fetched
    SeedFailed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Exhausted => "frontier exhausted",
            StopReason::UrlBudget => "URL budget reached",
            StopReason::Deadline => "run time exceeded",
            StopReason::SeedFailed => "seed fetch failed",
        };
        f.write_str(text)
    }
}

/// Everything a finished run hands downstream
#[derive(Debug)]
pub struct CrawlReport {
    /// Fetched pages in completion order (not discovery order)
    pub pages: Vec<PageRecord>,
    /// URLs claimed for fetching, successful or not
    pub dispatched: usize,
    /// Queued tasks dropped when the engine stopped
    pub discarded: usize,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

// Run-scoped mutable state, only ever touched with the run's lock held
struct CrawlState {
    engine: EngineState,
    visited: VisitedSet,
    dispatched: usize,
    stop_reason: Option<StopReason>,
    started: Instant,
}

impl CrawlState {
    fn new() -> Self {
        Self {
            engine: EngineState::Running,
            visited: VisitedSet::new(),
            dispatched: 0,
            stop_reason: None,
            started: Instant::now(),
        }
    }

    // Running -> Stopping; false if the engine already left Running
    fn begin_stopping(&mut self, reason: StopReason) -> bool {
        if self.engine != EngineState::Running {
            return false;
        }
        self.engine = EngineState::Stopping;
        self.stop_reason = Some(reason);
        true
    }

    // Any state -> Stopped, keeping the first recorded reason
    fn settle(&mut self, fallback: StopReason) -> StopReason {
        self.engine = EngineState::Stopped;
        *self.stop_reason.get_or_insert(fallback)
    }
}

/// The crawl engine
///
/// Built once per invocation. Each call to crawl() gets a fresh visited set
/// and crawl state, so nothing carries over between runs.
pub struct Frontier {
    policy: CrawlPolicy,
    fetcher: Fetcher,
}

impl Frontier {
    pub fn new(policy: CrawlPolicy, fetcher: Fetcher) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self { policy, fetcher })
    }

    pub fn policy(&self) -> &CrawlPolicy {
        &self.policy
    }

    // Crawls from the seed until the engine stops
    //
    // Returns: the report with every fetched page. If the seed itself can't
    // be fetched, the report holds exactly one synthetic error record.
    //
    // Errors only for a seed that can't anchor a crawl (not http(s), no
    // host). Network trouble is never an error here.
    pub async fn crawl(&self, seed: &str) -> Result<CrawlReport, PolicyError> {
        let seed_url = parse_seed(seed)?;

        // The domain anchor is the seed's host, whether or not the seed
        // fetch succeeds
        let base_domain = seed_url.host_str().unwrap_or_default().to_string();
        let seed = normalize_url(seed_url.as_str());

        let run = Arc::new(Run::new(
            self.policy.clone(),
            self.fetcher.clone(),
            base_domain,
        ));

        info!(
            seed = %seed,
            domain = %run.base_domain,
            concurrency = self.policy.concurrency,
            max_urls = self.policy.max_urls,
            max_run_time_ms = self.policy.max_run_time_ms,
            "Starting crawl"
        );

        // The seed is processed inline so nothing fans out before it lands
        if !run.claim(&seed).await {
            return Ok(run.seed_failure(&seed, "crawl stopped before the seed was fetched").await);
        }
        match run.fetcher.fetch(&seed, self.policy.request_timeout()).await {
            Ok(page) => {
                run.accept(page).await;
            }
            Err(e) => {
                warn!(url = %seed, error = %e, "Seed fetch failed");
                return Ok(run.seed_failure(&seed, e).await);
            }
        }

        run.check_deadline().await;

        if run.outstanding.load(Ordering::Acquire) > 0 && !run.stop.is_cancelled() {
            let workers: Vec<_> = (0..self.policy.concurrency)
                .map(|id| tokio::spawn(Arc::clone(&run).worker(id)))
                .collect();

            let started = run.state.lock().await.started;
            let deadline = tokio::time::Instant::from_std(started + self.policy.max_run_time());

            tokio::select! {
                _ = run.stop.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    run.stop_with(StopReason::Deadline).await;
                }
            }

            // In-flight fetches finish (or time out) on their own
            for result in join_all(workers).await {
                if let Err(e) = result {
                    warn!(error = %e, "Crawl worker failed");
                }
            }
        }

        let discarded = run.drain_queue().await;
        let (stop_reason, dispatched, visited, elapsed) = {
            let mut state = run.state.lock().await;
            let reason = state.settle(StopReason::Exhausted);
            (reason, state.dispatched, state.visited.len(), state.started.elapsed())
        };
        let pages = std::mem::take(&mut *run.records.lock().await);

        info!(
            pages = pages.len(),
            dispatched,
            visited,
            discarded,
            elapsed_ms = elapsed.as_millis() as u64,
            reason = %stop_reason,
            "Crawl stopped"
        );

        Ok(CrawlReport {
            pages,
            dispatched,
            discarded,
            stop_reason,
            elapsed,
        })
    }
}

// Shared state of one crawl run, owned by the workers through an Arc
struct Run {
    policy: CrawlPolicy,
    fetcher: Fetcher,
    base_domain: String,
    state: Mutex<CrawlState>,
    records: Mutex<Vec<PageRecord>>,
    queue_tx: mpsc::UnboundedSender<String>,
    queue_rx: Mutex<mpsc::UnboundedReceiver<String>>,
    // Tasks queued or being processed
    outstanding: AtomicUsize,
    stop: CancellationToken,
}

impl Run {
    fn new(policy: CrawlPolicy, fetcher: Fetcher, base_domain: String) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            policy,
            fetcher,
            base_domain,
            state: Mutex::new(CrawlState::new()),
            records: Mutex::new(Vec::new()),
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            outstanding: AtomicUsize::new(0),
            stop: CancellationToken::new(),
        }
    }

    // Claims a normalized URL for fetching
    //
    // Returns false (and the task is silently dropped) when the engine is
    // not Running, the URL was already visited, or the budget is spent.
    async fn claim(&self, url: &str) -> bool {
        let mut state = self.state.lock().await;

        if state.engine == EngineState::Running
            && state.started.elapsed() >= self.policy.max_run_time()
        {
            self.stop_locked(&mut state, StopReason::Deadline);
        }

        if state.engine != EngineState::Running
            || state.visited.is_visited(url)
            || state.dispatched >= self.policy.max_urls
        {
            return false;
        }

        state.visited.mark_visited(url);
        state.dispatched += 1;
        debug!(url, dispatched = state.dispatched, "Claimed URL");

        if state.dispatched >= self.policy.max_urls {
            self.stop_locked(&mut state, StopReason::UrlBudget);
        }
        true
    }

    fn stop_locked(&self, state: &mut CrawlState, reason: StopReason) {
        if state.begin_stopping(reason) {
            info!(reason = %reason, dispatched = state.dispatched, "Crawl stopping");
        }
        self.stop.cancel();
    }

    async fn stop_with(&self, reason: StopReason) {
        let mut state = self.state.lock().await;
        self.stop_locked(&mut state, reason);
    }

    async fn check_deadline(&self) {
        let mut state = self.state.lock().await;
        if state.engine == EngineState::Running
            && state.started.elapsed() >= self.policy.max_run_time()
        {
            self.stop_locked(&mut state, StopReason::Deadline);
        }
    }

    // Running -> Stopped when the last outstanding task finishes
    async fn exhausted(&self) {
        let mut state = self.state.lock().await;
        if state.engine == EngineState::Running {
            state.engine = EngineState::Stopped;
            state.stop_reason = Some(StopReason::Exhausted);
            info!(dispatched = state.dispatched, "Frontier exhausted");
        }
        self.stop.cancel();
    }

    async fn seed_failure(&self, seed: &str, error: impl fmt::Display) -> CrawlReport {
        self.stop.cancel();
        let mut state = self.state.lock().await;
        state.stop_reason = Some(StopReason::SeedFailed);
        let stop_reason = state.settle(StopReason::SeedFailed);

        CrawlReport {
            pages: vec![PageRecord::failed(seed, error)],
            dispatched: state.dispatched,
            discarded: 0,
            stop_reason,
            elapsed: state.started.elapsed(),
        }
    }

    // Stores a fetched page and queues its admissible links
    async fn accept(&self, page: PageRecord) -> usize {
        let current = page.url.clone();
        let links = page.links.clone();
        self.records.lock().await.push(page);
        self.schedule(&current, &links).await
    }

    // Screens links and queues the ones not yet visited
    //
    // Returns: how many tasks were queued
    async fn schedule(&self, current: &str, links: &[String]) -> usize {
        let mut seen = HashSet::new();
        let admitted: Vec<String> = links
            .iter()
            .filter_map(|link| {
                match filter::screen(link, current, &self.base_domain, &self.policy) {
                    Ok(normalized) => Some(normalized),
                    Err(rejection) => {
                        debug!(link = %link, reason = %rejection, "Link rejected");
                        None
                    }
                }
            })
            .filter(|link| seen.insert(link.clone()))
            .collect();

        let state = self.state.lock().await;
        let mut queued = 0;
        for link in admitted {
            if state.engine != EngineState::Running {
                break;
            }
            if state.visited.is_visited(&link) {
                continue;
            }

            self.outstanding.fetch_add(1, Ordering::AcqRel);
            if self.queue_tx.send(link).is_err() {
                self.outstanding.fetch_sub(1, Ordering::AcqRel);
                break;
            }
            queued += 1;
        }
        queued
    }

    // One task: claim, fetch, store, fan out
    async fn process(&self, url: &str) {
        let url = normalize_url(url);
        if !self.claim(&url).await {
            return;
        }

        match self.fetcher.fetch(&url, self.policy.request_timeout()).await {
            Ok(page) => {
                self.accept(page).await;
            }
            Err(e) => {
                debug!(url = %url, error = %e, "Fetch failed");
            }
        }
    }

    // Pulls tasks until the stop signal fires
    async fn worker(self: Arc<Self>, id: usize) {
        debug!(worker = id, "Worker started");

        loop {
            let next = {
                let mut queue = self.queue_rx.lock().await;
                tokio::select! {
                    biased;
                    _ = self.stop.cancelled() => None,
                    url = queue.recv() => url,
                }
            };
            let Some(url) = next else { break };

            self.process(&url).await;

            if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
                self.exhausted().await;
            }
        }

        debug!(worker = id, "Worker stopped");
    }

    // Drops every task still waiting in the queue
    async fn drain_queue(&self) -> usize {
        let mut queue = self.queue_rx.lock().await;
        queue.close();

        let mut discarded = 0;
        while queue.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            info!(discarded, "Discarded queued tasks");
        }
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Mock, Server, ServerGuard};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn frontier(policy: CrawlPolicy) -> Frontier {
        Frontier::new(policy, Fetcher::new().unwrap()).unwrap()
    }

    fn html(title: &str, links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|link| format!(r#"<a href="{link}">{link}</a>"#))
            .collect();
        format!("<html><head><title>{title}</title></head><body><p>{title}</p>{anchors}</body></html>")
    }

    async fn page(server: &mut ServerGuard, path: &str, links: &[&str]) -> Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(html(path, links))
            .expect(1)
            .create_async()
            .await
    }

    fn urls(report: &CrawlReport) -> Vec<String> {
        let mut urls: Vec<String> = report.pages.iter().map(|p| p.url.clone()).collect();
        urls.sort();
        urls
    }

    #[tokio::test]
    async fn test_cycle_terminates_with_two_pages() {
        let mut server = Server::new_async().await;
        let a = page(&mut server, "/a", &["/b"]).await;
        let b = page(&mut server, "/b", &["/a"]).await;

        let report = frontier(CrawlPolicy::default())
            .crawl(&format!("{}/a", server.url()))
            .await
            .unwrap();

        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.dispatched, 2);
        assert_eq!(report.stop_reason, StopReason::Exhausted);
        assert_eq!(
            urls(&report),
            vec![format!("{}/a", server.url()), format!("{}/b", server.url())]
        );
        a.assert_async().await;
        b.assert_async().await;
    }

    #[tokio::test]
    async fn test_each_url_fetched_once_across_parents_and_variants() {
        let mut server = Server::new_async().await;
        let a = page(&mut server, "/a", &["/b", "/b#intro", "/b?lang=en", "/c"]).await;
        let b = page(&mut server, "/b", &["/c", "/a#top"]).await;
        let c = page(&mut server, "/c", &["/b", "/a"]).await;

        let report = frontier(CrawlPolicy::default())
            .crawl(&format!("{}/a#start", server.url()))
            .await
            .unwrap();

        let found = urls(&report);
        let unique: HashSet<&String> = found.iter().collect();
        assert_eq!(found.len(), 3);
        assert_eq!(unique.len(), 3);
        a.assert_async().await;
        b.assert_async().await;
        c.assert_async().await;
    }

    #[tokio::test]
    async fn test_pdf_link_is_never_fetched() {
        let mut server = Server::new_async().await;
        page(&mut server, "/a", &["/doc.pdf"]).await;
        let pdf = server
            .mock("GET", "/doc.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .expect(0)
            .create_async()
            .await;

        let report = frontier(CrawlPolicy::default())
            .crawl(&format!("{}/a", server.url()))
            .await
            .unwrap();

        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.dispatched, 1);
        pdf.assert_async().await;
    }

    #[tokio::test]
    async fn test_url_budget_caps_dispatch() {
        let mut server = Server::new_async().await;
        let children: Vec<String> = (0..20).map(|i| format!("/p{i}")).collect();
        let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
        page(&mut server, "/", &child_refs).await;
        for child in &children {
            server
                .mock("GET", child.as_str())
                .with_status(200)
                .with_header("content-type", "text/html")
                .with_body(html(child, &["/"]))
                .create_async()
                .await;
        }

        let policy = CrawlPolicy {
            concurrency: 8,
            max_urls: 5,
            ..CrawlPolicy::default()
        };
        let report = frontier(policy)
            .crawl(&format!("{}/", server.url()))
            .await
            .unwrap();

        assert_eq!(report.dispatched, 5);
        assert_eq!(report.pages.len(), 5);
        assert_eq!(report.stop_reason, StopReason::UrlBudget);
        assert!(report.discarded > 0);
    }

    #[tokio::test]
    async fn test_budget_of_one_only_fetches_seed() {
        let mut server = Server::new_async().await;
        page(&mut server, "/a", &["/b"]).await;

        let policy = CrawlPolicy {
            max_urls: 1,
            ..CrawlPolicy::default()
        };
        let report = frontier(policy)
            .crawl(&format!("{}/a", server.url()))
            .await
            .unwrap();

        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.stop_reason, StopReason::UrlBudget);
    }

    #[tokio::test]
    async fn test_seed_network_failure_yields_error_record() {
        let report = frontier(CrawlPolicy::default())
            .crawl("http://127.0.0.1:1/start")
            .await
            .unwrap();

        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.stop_reason, StopReason::SeedFailed);
        let record = &report.pages[0];
        assert_eq!(record.title.as_deref(), Some("Error"));
        assert!(record.content.contains("http://127.0.0.1:1/start"));
        assert!(record.is_failure());
    }

    #[tokio::test]
    async fn test_seed_http_error_yields_error_record() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/gone")
            .with_status(410)
            .with_header("content-type", "text/html")
            .with_body("gone")
            .create_async()
            .await;

        let report = frontier(CrawlPolicy::default())
            .crawl(&format!("{}/gone", server.url()))
            .await
            .unwrap();

        assert_eq!(report.pages.len(), 1);
        assert!(report.pages[0].content.contains("HTTP 410"));
        assert_eq!(report.stop_reason, StopReason::SeedFailed);
    }

    #[tokio::test]
    async fn test_failed_child_adds_no_record() {
        let mut server = Server::new_async().await;
        page(&mut server, "/a", &["/broken", "/b"]).await;
        page(&mut server, "/b", &[]).await;
        server
            .mock("GET", "/broken")
            .with_status(500)
            .create_async()
            .await;

        let report = frontier(CrawlPolicy::default())
            .crawl(&format!("{}/a", server.url()))
            .await
            .unwrap();

        assert_eq!(report.dispatched, 3);
        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.stop_reason, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_redirected_page_links_are_followed() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/docs")
            .with_status(301)
            .with_header("location", "/docs/")
            .create_async()
            .await;
        page(&mut server, "/docs/", &["intro"]).await;
        let intro = page(&mut server, "/docs/intro", &[]).await;

        let seed = format!("{}/docs", server.url());
        let report = frontier(CrawlPolicy::default()).crawl(&seed).await.unwrap();

        assert_eq!(report.stop_reason, StopReason::Exhausted);
        assert_eq!(report.dispatched, 2);
        assert_eq!(urls(&report), vec![seed, format!("{}/docs/intro", server.url())]);
        intro.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_seed_is_rejected() {
        let result = frontier(CrawlPolicy::default()).crawl("ftp://ex.com/").await;
        assert!(matches!(result, Err(PolicyError::InvalidSeed { .. })));
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let policy = CrawlPolicy {
            concurrency: 0,
            ..CrawlPolicy::default()
        };
        let result = Frontier::new(policy, Fetcher::new().unwrap());
        assert!(matches!(result, Err(PolicyError::Concurrency(0))));
    }

    // Serves "/" instantly (linking to six slow pages) and every other path
    // after `delay`
    async fn spawn_slow_site(delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let body = if path == "/" {
                        let links: Vec<String> = (0..6).map(|i| format!("/slow/{i}")).collect();
                        let refs: Vec<&str> = links.iter().map(String::as_str).collect();
                        html("Home", &refs)
                    } else {
                        tokio::time::sleep(delay).await;
                        html(&path, &[])
                    };

                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_deadline_stops_run_with_partial_result() {
        let base = spawn_slow_site(Duration::from_secs(3)).await;

        let policy = CrawlPolicy {
            concurrency: 2,
            request_timeout_ms: 800,
            max_run_time_ms: 300,
            ..CrawlPolicy::default()
        };
        let started = Instant::now();
        let report = frontier(policy)
            .crawl(&format!("{base}/"))
            .await
            .unwrap();

        // Seed landed; the two in-flight fetches timed out; the rest were dropped
        assert_eq!(report.stop_reason, StopReason::Deadline);
        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.dispatched, 3);
        assert_eq!(report.discarded, 4);
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
