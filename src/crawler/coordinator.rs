//! Crawler coordinator - recursive traversal orchestration
//!
//! This module contains the traversal engine that coordinates all aspects of
//! a crawl session, including:
//! - Claiming URLs in the visited set before fetching them
//! - Bounding in-flight fetches with the shared limiter
//! - Running each fetch as a managed, retried operation
//! - Recording script resources and fanning out to same-origin links
//! - Joining every spawned child before a crawl call returns

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_page};
use crate::crawler::limiter::{ConcurrencyLimiter, InFlightCounter};
use crate::crawler::parser::parse_html;
use crate::output::{CrawlReport, ResourceSink};
use crate::retry::{retry, RetryConfig, RetryResult, RetryStats};
use crate::state::{ResourceSet, VisitedSet};
use crate::timeout::TimeoutManager;
use crate::url::{crawl_candidate, parse_seed, Origin};
use crate::{FinderError, UrlError};
use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{Instrument, Span};
use url::Url;

/// A URL scheduled at a given depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: u32,
}

/// Same-origin JavaScript crawler
///
/// Cloning the crawler shares its HTTP client, concurrency limit, timeout
/// manager and resource set. Construction must happen inside a Tokio runtime.
#[derive(Clone)]
pub struct Crawler {
    engine: Arc<Engine>,
}

struct Engine {
    config: Config,
    client: Client,
    limiter: ConcurrencyLimiter,
    timeouts: TimeoutManager,
    retry: RetryConfig,
    resources: ResourceSet,
    retry_stats: Mutex<RetryStats>,
    span: Span,
}

/// State of one `crawl_domain` call
struct Session {
    engine: Arc<Engine>,
    origin: Origin,
    visited: VisitedSet,
    pages_fetched: AtomicU64,
    pages_failed: AtomicU64,
    resources_discovered: AtomicU64,
    in_flight: Arc<InFlightCounter>,
    span: Span,
}

impl Crawler {
    /// Creates a crawler writing to the configured output
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be opened or the HTTP client
    /// cannot be built.
    pub fn new(config: Config) -> Result<Self, FinderError> {
        let sink = crate::output::open_sink(config.output.path.as_deref())?;
        Self::with_sink(config, sink)
    }

    /// Creates a crawler writing resources to `sink`
    pub fn with_sink(config: Config, sink: Arc<dyn ResourceSink>) -> Result<Self, FinderError> {
        let client = build_http_client(&config.crawler)?;
        let limiter = ConcurrencyLimiter::new(config.crawler.threads);
        let timeouts = TimeoutManager::new(config.timeouts.to_timeout_config());
        let retry = config.retry.to_retry_config();
        let span = tracing::info_span!("crawler");

        tracing::debug!(
            parent: &span,
            threads = config.crawler.threads,
            max_depth = config.crawler.max_depth,
            max_attempts = retry.max_attempts(),
            "Crawler initialized"
        );

        Ok(Self {
            engine: Arc::new(Engine {
                config,
                client,
                limiter,
                timeouts,
                retry,
                resources: ResourceSet::new(sink),
                retry_stats: Mutex::new(RetryStats::default()),
                span,
            }),
        })
    }

    /// Crawls the origin of `seed` up to the configured depth
    ///
    /// Returns once every reachable page within the depth bound has been
    /// fetched or has failed. Per-page failures are logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns `FinderError::InvalidSeed` if the seed is not a usable HTTP(S)
    /// URL and `FinderError::Cancelled` if the crawler was already shut down.
    pub async fn crawl_domain(&self, seed: &str) -> Result<CrawlReport, FinderError> {
        let url = parse_seed(seed).map_err(|source| FinderError::InvalidSeed {
            seed: seed.to_string(),
            source,
        })?;
        let origin = Origin::of(&url).ok_or_else(|| FinderError::InvalidSeed {
            seed: seed.to_string(),
            source: UrlError::MissingHost,
        })?;

        let global = self.engine.timeouts.global_token();
        if global.is_cancelled() {
            return Err(FinderError::Cancelled);
        }

        let span = tracing::info_span!(parent: &self.engine.span, "session", origin = %origin);
        let session = Arc::new(Session::new(Arc::clone(&self.engine), origin, span.clone()));
        let mut report = CrawlReport::new(url.as_str());
        let started = Instant::now();

        tracing::info!(parent: &span, seed = %url, "Starting crawl");

        Arc::clone(&session)
            .crawl_url(CrawlTask { url, depth: 0 })
            .instrument(span.clone())
            .await;

        if let Err(e) = self.engine.resources.flush() {
            tracing::warn!(parent: &span, error = %e, "Failed to flush output");
        }

        report.duration = started.elapsed();
        report.pages_fetched = session.pages_fetched.load(Ordering::Relaxed);
        report.pages_failed = session.pages_failed.load(Ordering::Relaxed);
        report.resources_discovered = session.resources_discovered.load(Ordering::Relaxed);
        report.peak_in_flight = session.in_flight.peak();
        report.cancelled = global.is_cancelled();

        tracing::info!(
            parent: &span,
            pages_fetched = report.pages_fetched,
            pages_failed = report.pages_failed,
            resources = report.resources_discovered,
            peak_in_flight = report.peak_in_flight,
            elapsed = ?report.duration,
            "Crawl finished"
        );
        tracing::info!(parent: &span, stats = %self.retry_stats(), "Retry statistics");

        Ok(report)
    }

    /// Crawls one seed per line of `reader`, in order
    ///
    /// Blank lines are skipped. A seed that cannot be crawled is logged and
    /// skipped; only a read failure of `reader` itself is returned.
    pub async fn crawl_from_source<R>(&self, reader: R) -> Result<Vec<CrawlReport>, FinderError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut reports = Vec::new();

        while let Some(line) = lines.next_line().await.map_err(FinderError::SeedInput)? {
            let seed = line.trim();
            if seed.is_empty() {
                continue;
            }

            match self.crawl_domain(seed).await {
                Ok(report) => reports.push(report),
                Err(FinderError::Cancelled) => {
                    tracing::warn!(parent: &self.engine.span, "Crawler shut down, ignoring remaining seeds");
                    break;
                }
                Err(e) => {
                    tracing::warn!(parent: &self.engine.span, seed, error = %e, "Skipping seed");
                }
            }
        }

        Ok(reports)
    }

    /// Crawls `domain`, or every seed on stdin when it is `None`, then shuts
    /// the crawler down
    pub async fn run(&self, domain: Option<String>) -> Result<Vec<CrawlReport>, FinderError> {
        let result = match domain {
            Some(domain) => self.crawl_domain(&domain).await.map(|report| vec![report]),
            None => {
                tracing::info!(parent: &self.engine.span, "Reading seeds from stdin");
                self.crawl_from_source(BufReader::new(tokio::io::stdin()))
                    .await
            }
        };

        self.shutdown().await;
        result
    }

    /// Cancels every in-flight fetch and stops accepting new work
    pub async fn shutdown(&self) {
        tracing::info!(parent: &self.engine.span, "Shutting down crawler");
        self.engine.timeouts.shutdown().await;
        if let Err(e) = self.engine.resources.flush() {
            tracing::warn!(parent: &self.engine.span, error = %e, "Failed to flush output");
        }
    }

    /// Every resource discovered so far, sorted
    pub fn resources(&self) -> Vec<String> {
        self.engine.resources.snapshot()
    }

    /// Retry statistics across every fetch this crawler made
    pub fn retry_stats(&self) -> RetryStats {
        self.engine
            .retry_stats
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Highest number of simultaneous fetches seen by this crawler
    pub fn peak_in_flight(&self) -> usize {
        self.engine.limiter.peak()
    }

    pub fn timeouts(&self) -> &TimeoutManager {
        &self.engine.timeouts
    }
}

impl Session {
    fn new(engine: Arc<Engine>, origin: Origin, span: Span) -> Self {
        Self {
            engine,
            origin,
            visited: VisitedSet::new(),
            pages_fetched: AtomicU64::new(0),
            pages_failed: AtomicU64::new(0),
            resources_discovered: AtomicU64::new(0),
            in_flight: Arc::new(InFlightCounter::new()),
            span,
        }
    }

    /// Visits `task` and everything reachable from it within the depth bound
    ///
    /// The permit is held for this page's fetch only; children run after it
    /// is released and are joined before the future completes.
    fn crawl_url(self: Arc<Self>, task: CrawlTask) -> BoxFuture<'static, ()> {
        async move {
            let max_depth = self.engine.config.crawler.max_depth;
            if task.depth > max_depth {
                return;
            }

            if !self.visited.insert(task.url.as_str()) {
                tracing::trace!(url = %task.url, "Already visited");
                return;
            }

            let global = self.engine.timeouts.global_token();
            let permit = self
                .engine
                .limiter
                .acquire_counted(&global, Some(&self.in_flight))
                .await;
            let Some(permit) = permit else {
                tracing::debug!(url = %task.url, "Cancelled while waiting for a fetch slot");
                return;
            };

            let result = self.fetch(&task).await;
            drop(permit);

            let Some(body) = result.value else {
                return;
            };

            let parsed = parse_html(&body, &task.url);
            drop(body);

            for script in &parsed.scripts {
                self.record_resource(script);
            }

            if task.depth >= max_depth {
                return;
            }

            let excluded = &self.engine.config.crawler.excluded_extensions;
            let mut children = JoinSet::new();
            for link in &parsed.links {
                let Some(url) = crawl_candidate(link, &self.origin, excluded) else {
                    continue;
                };
                if self.visited.contains(url.as_str()) {
                    continue;
                }

                let child = CrawlTask {
                    url,
                    depth: task.depth + 1,
                };
                children.spawn(
                    Arc::clone(&self)
                        .crawl_url(child)
                        .instrument(self.span.clone()),
                );
            }

            while let Some(joined) = children.join_next().await {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!(parent: &self.span, error = %e, "Crawl task panicked");
                    }
                }
            }
        }
        .boxed()
    }

    /// Fetches one page as a managed operation with retries
    async fn fetch(&self, task: &CrawlTask) -> RetryResult<String> {
        let engine = &self.engine;
        let op_id = format!("crawl-{}-{}", task.url, task.depth);
        let operation = engine.timeouts.create_operation(op_id.clone(), None);

        let client = &engine.client;
        let timeouts = &engine.timeouts;
        let url = &task.url;
        let id = op_id.as_str();

        let result = retry(operation.token(), &engine.retry, move |attempt, _token| async move {
            timeouts.send_heartbeat(id);
            tracing::trace!(url = %url, attempt, "Fetching");
            fetch_page(client, url).await
        })
        .await;

        engine.timeouts.complete_operation(&op_id);
        engine
            .retry_stats
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .record(&result);

        if result.succeeded {
            self.pages_fetched.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                url = %task.url,
                depth = task.depth,
                attempts = result.attempts_made,
                "Fetched page"
            );
        } else {
            self.pages_failed.fetch_add(1, Ordering::Relaxed);
            if let Some(err) = &result.last_error {
                err.clone()
                    .wrap(format!(
                        "failed to crawl {} after {} attempts",
                        task.url, result.attempts_made
                    ))
                    .log(&[
                        ("url", task.url.to_string()),
                        ("depth", task.depth.to_string()),
                        ("attempts", result.attempts_made.to_string()),
                    ]);
            }
        }

        result
    }

    fn record_resource(&self, script: &Url) {
        match self.engine.resources.insert(script.as_str()) {
            Ok(true) => {
                self.resources_discovered.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(resource = %script, "Found JavaScript resource");
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(resource = %script, error = %e, "Failed to write resource");
            }
        }
    }
}
