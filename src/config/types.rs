use crate::retry::{HttpStatusPolicy, RetryConfig};
use crate::timeout::TimeoutConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Extensions that never lead to an HTML page
const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &[
    ".css", ".js", ".mjs", ".json", ".xml", ".txt", ".png", ".jpg", ".jpeg", ".gif", ".svg",
    ".ico", ".webp", ".bmp", ".woff", ".woff2", ".ttf", ".eot", ".otf", ".pdf", ".zip", ".gz",
    ".tar", ".rar", ".7z", ".mp3", ".mp4", ".avi", ".mov", ".webm", ".wav", ".ogg",
];

/// Main configuration structure for jsfinder
///
/// Every section is optional; missing keys take their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub retry: RetrySettings,
    pub timeouts: TimeoutSettings,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum depth to crawl from the seed (inclusive)
    pub max_depth: u32,

    /// Maximum number of concurrent page fetches
    pub threads: usize,

    /// Per-request HTTP client timeout (seconds)
    pub timeout: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Link path extensions that are never crawled, with leading dot
    pub excluded_extensions: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            threads: 10,
            timeout: 30,
            user_agent: format!("jsfinder/{}", env!("CARGO_PKG_VERSION")),
            excluded_extensions: DEFAULT_EXCLUDED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Named retry presets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryPreset {
    #[default]
    Network,
    Quick,
    Default,
}

/// Retry policy configuration: a preset plus optional overrides
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetrySettings {
    pub preset: RetryPreset,
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub backoff_factor: Option<f64>,
    pub jitter: Option<bool>,

    /// Budget for all attempts of one fetch; 0 disables it
    pub overall_timeout_secs: Option<u64>,

    pub http_status_policy: HttpStatusPolicy,
}

impl RetrySettings {
    /// Builds the effective retry policy
    pub fn to_retry_config(&self) -> RetryConfig {
        let mut config = match self.preset {
            RetryPreset::Network => RetryConfig::network(),
            RetryPreset::Quick => RetryConfig::quick(),
            RetryPreset::Default => RetryConfig::default(),
        };

        if let Some(attempts) = self.max_attempts {
            config = config.with_max_attempts(attempts);
        }
        if let Some(ms) = self.initial_delay_ms {
            config = config.with_initial_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.max_delay_ms {
            config = config.with_max_delay(Duration::from_millis(ms));
        }
        if let Some(factor) = self.backoff_factor {
            config = config.with_backoff_factor(factor);
        }
        if let Some(jitter) = self.jitter {
            config = config.with_jitter(jitter);
        }
        if let Some(secs) = self.overall_timeout_secs {
            config = config
                .with_overall_timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }

        config.with_http_status_policy(self.http_status_policy)
    }
}

/// Named timeout presets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeoutPreset {
    #[default]
    Crawler,
    Http,
    Default,
}

/// Operation timeout configuration: a preset plus optional overrides
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TimeoutSettings {
    pub preset: TimeoutPreset,
    pub operation_timeout_secs: Option<u64>,
    pub global_timeout_secs: Option<u64>,
    pub heartbeat_interval_secs: Option<u64>,
    pub grace_period_secs: Option<u64>,
}

impl TimeoutSettings {
    /// Builds the effective timeout budgets
    pub fn to_timeout_config(&self) -> TimeoutConfig {
        let mut config = match self.preset {
            TimeoutPreset::Crawler => TimeoutConfig::crawler(),
            TimeoutPreset::Http => TimeoutConfig::http(),
            TimeoutPreset::Default => TimeoutConfig::default(),
        };

        if let Some(secs) = self.operation_timeout_secs {
            config.operation_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.global_timeout_secs {
            config.global_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.heartbeat_interval_secs {
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.grace_period_secs {
            config.grace_period = Duration::from_secs(secs);
        }

        config
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// File receiving one resource per line; stdout when unset
    pub path: Option<PathBuf>,
}
