//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and timeout management
//! - HTML parsing and link/script extraction
//! - Global concurrency limiting
//! - Recursive traversal coordination

mod coordinator;
mod fetcher;
mod limiter;
mod parser;

pub use coordinator::{CrawlTask, Crawler};
pub use fetcher::{build_http_client, fetch_page};
pub use limiter::{ConcurrencyLimiter, FetchPermit, InFlightCounter};
pub use parser::{extract_links, extract_script_references, parse_html, ParsedPage};

use crate::config::Config;
use crate::output::CrawlReport;
use crate::FinderError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the output destination
/// 2. Build the crawler (HTTP client, limiter, timeout manager)
/// 3. Crawl `domain`, or every seed read from stdin when it is `None`
/// 4. Shut the crawler down and flush the output
///
/// # Example
///
/// ```no_run
/// use jsfinder::config::Config;
/// use jsfinder::crawler::run_crawl;
///
/// # async fn example() -> Result<(), jsfinder::FinderError> {
/// let reports = run_crawl(Config::default(), Some("example.com".to_string())).await?;
/// println!("Crawled {} origin(s)", reports.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    domain: Option<String>,
) -> Result<Vec<CrawlReport>, FinderError> {
    Crawler::new(config)?.run(domain).await
}
