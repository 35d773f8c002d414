//! Configuration module for jsfinder
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use jsfinder::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("jsfinder.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, RetryPreset, RetrySettings, TimeoutPreset,
    TimeoutSettings,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
