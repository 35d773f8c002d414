//! jsfinder main entry point
//!
//! This is the command-line interface for the jsfinder crawler.

use anyhow::Context;
use clap::Parser;
use jsfinder::config::{load_config, validate, Config};
use jsfinder::Crawler;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// jsfinder: find JavaScript files on a web origin
///
/// jsfinder crawls same-origin links from a seed up to a bounded depth and
/// prints every JavaScript resource it finds, one URL per line. Without
/// `--domain`, seeds are read from stdin, one per line.
#[derive(Parser, Debug)]
#[command(name = "jsfinder")]
#[command(version)]
#[command(about = "Crawl a site and list its JavaScript files", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Seed URL or domain to crawl (reads stdin when omitted)
    #[arg(short, long)]
    domain: Option<String>,

    /// Write results to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum crawl depth
    #[arg(long)]
    depth: Option<u32>,

    /// Maximum concurrent fetches
    #[arg(short, long)]
    threads: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Loads the config file, if any, and applies flag overrides
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                load_config(path)
                    .with_context(|| format!("failed to load {}", path.display()))?
            }
            None => Config::default(),
        };

        if let Some(depth) = self.depth {
            config.crawler.max_depth = depth;
        }
        if let Some(threads) = self.threads {
            config.crawler.threads = threads;
        }
        if let Some(timeout) = self.timeout {
            config.crawler.timeout = timeout;
        }
        if let Some(output) = &self.output {
            config.output.path = Some(output.clone());
        }

        validate(&config).context("invalid command line options")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = cli.resolve_config()?;
    tracing::info!(
        "Max depth: {}, threads: {}, request timeout: {}s",
        config.crawler.max_depth,
        config.crawler.threads,
        config.crawler.timeout
    );

    let crawler = Crawler::new(config)?;

    let interrupted = crawler.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, shutting down");
            interrupted.shutdown().await;
        }
    });

    match crawler.run(cli.domain).await {
        Ok(reports) => {
            for report in &reports {
                tracing::info!("{}", report);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries results only.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("jsfinder=info,warn"),
            1 => EnvFilter::new("jsfinder=debug,info"),
            2 => EnvFilter::new("jsfinder=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
