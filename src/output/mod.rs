//! Output module for streaming crawl results
//!
//! This module handles:
//! - Writing discovered resources, one per line, to stdout or a file
//! - Reporting per-session crawl counters

mod sink;
mod traits;

pub use sink::{LineSink, MemorySink};
pub use traits::{CrawlReport, ResourceSink};

use crate::FinderError;
use std::path::Path;
use std::sync::Arc;

/// Opens the configured output destination
///
/// `None` writes to stdout. A file path is created or truncated.
///
/// # Errors
///
/// Returns `FinderError::Output` if the file cannot be created.
pub fn open_sink(path: Option<&Path>) -> Result<Arc<dyn ResourceSink>, FinderError> {
    match path {
        None => Ok(Arc::new(LineSink::stdout())),
        Some(path) => {
            let sink = LineSink::create(path).map_err(|source| FinderError::Output {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!(path = %path.display(), "Writing results to file");
            Ok(Arc::new(sink))
        }
    }
}
