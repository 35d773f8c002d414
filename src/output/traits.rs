//! Output sink trait and crawl report types
//!
//! This module defines the trait interface for resource sinks and the
//! per-session report returned by a crawl.

use chrono::{DateTime, Utc};
use std::fmt;
use std::io;
use std::time::Duration;

/// Destination for discovered resource URLs
///
/// Implementations must be thread-safe. Every call writes one resource; the
/// caller guarantees each resource is written at most once.
pub trait ResourceSink: Send + Sync {
    /// Appends one resource URL
    fn write(&self, resource: &str) -> io::Result<()>;

    /// Flushes buffered output
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Summary of one crawl session
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Normalized seed URL the session started from
    pub seed: String,

    pub started_at: DateTime<Utc>,
    pub duration: Duration,

    /// Pages fetched successfully
    pub pages_fetched: u64,

    /// Pages whose fetch failed after retries
    pub pages_failed: u64,

    /// Resources first seen during this session
    pub resources_discovered: u64,

    /// Highest number of simultaneous fetches observed
    pub peak_in_flight: usize,

    /// Whether the session was cut short by cancellation
    pub cancelled: bool,
}

impl CrawlReport {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
            pages_fetched: 0,
            pages_failed: 0,
            resources_discovered: 0,
            peak_in_flight: 0,
            cancelled: false,
        }
    }

    /// Returns the total number of pages attempted
    pub fn pages_attempted(&self) -> u64 {
        self.pages_fetched + self.pages_failed
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_attempted();
        if attempted == 0 {
            return 0.0;
        }
        (self.pages_fetched as f64 / attempted as f64) * 100.0
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} fetched, {} failed, {} resources, peak {} in flight, {:.2}s",
            self.seed,
            self.pages_fetched,
            self.pages_failed,
            self.resources_discovered,
            self.peak_in_flight,
            self.duration.as_secs_f64()
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}
