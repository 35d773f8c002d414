//! jsfinder: a same-origin JavaScript reference crawler
//!
//! This crate walks a web origin by following same-origin links up to a
//! bounded depth, with bounded concurrency, and records every JavaScript
//! resource it finds. Every fetch runs as a cancellable, heartbeat-monitored
//! operation and is retried with exponential backoff on transient failures.

pub mod config;
pub mod crawler;
pub mod error;
pub mod output;
pub mod retry;
pub mod state;
pub mod timeout;
pub mod url;

use thiserror::Error;

/// Session-level error type for jsfinder operations
///
/// Only setup failures surface through this type. Failures of individual
/// links are classified as [`error::AppError`], logged and swallowed.
#[derive(Debug, Error)]
pub enum FinderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to open output {}: {source}", path.display())]
    Output {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid seed URL '{seed}': {source}")]
    InvalidSeed { seed: String, source: UrlError },

    #[error("Failed to read seed input: {0}")]
    SeedInput(std::io::Error),

    #[error("Crawl cancelled before it could start")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for jsfinder session operations
pub type Result<T> = std::result::Result<T, FinderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Crawler};
pub use error::{AppError, ErrorKind};
pub use output::CrawlReport;
pub use retry::{retry, RetryConfig, RetryResult};
pub use timeout::{Operation, TimeoutConfig, TimeoutManager};
