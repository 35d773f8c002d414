use crate::config::types::{Config, CrawlerConfig, RetrySettings, TimeoutSettings};
use crate::{ConfigError, ConfigResult};
use std::time::Duration;

/// Upper bound on concurrent fetches
const MAX_THREADS: usize = 500;

/// Upper bound on any configured timeout (one week)
const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_settings(&config.retry)?;
    validate_timeout_settings(&config.timeouts)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.threads < 1 || config.threads > MAX_THREADS {
        return Err(ConfigError::Validation(format!(
            "threads must be between 1 and {}, got {}",
            MAX_THREADS, config.threads
        )));
    }

    if config.timeout < 1 || config.timeout > MAX_TIMEOUT_SECS {
        return Err(ConfigError::Validation(format!(
            "timeout must be between 1s and {}s, got {}s",
            MAX_TIMEOUT_SECS, config.timeout
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    for ext in &config.excluded_extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "excluded extension '{}' must start with '.'",
                ext
            )));
        }
    }

    Ok(())
}

/// Validates retry settings against the preset they extend
fn validate_retry_settings(settings: &RetrySettings) -> ConfigResult<()> {
    if settings.max_attempts == Some(0) {
        return Err(ConfigError::Validation(
            "max-attempts must be >= 1".to_string(),
        ));
    }

    if let Some(secs) = settings.overall_timeout_secs {
        if secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Validation(format!(
                "overall-timeout-secs must be <= {}, got {}",
                MAX_TIMEOUT_SECS, secs
            )));
        }
    }

    let retry = settings.to_retry_config();

    if retry.backoff_factor().is_nan() || retry.backoff_factor() < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff-factor must be >= 1.0, got {}",
            retry.backoff_factor()
        )));
    }

    if retry.initial_delay() > retry.max_delay() {
        return Err(ConfigError::Validation(format!(
            "initial delay ({:?}) cannot exceed max delay ({:?})",
            retry.initial_delay(),
            retry.max_delay()
        )));
    }

    Ok(())
}

/// Validates operation timeout settings
fn validate_timeout_settings(settings: &TimeoutSettings) -> ConfigResult<()> {
    let timeouts = settings.to_timeout_config();

    let max = Duration::from_secs(MAX_TIMEOUT_SECS);

    for (name, value) in [
        ("operation-timeout-secs", timeouts.operation_timeout),
        ("global-timeout-secs", timeouts.global_timeout),
        ("heartbeat-interval-secs", timeouts.heartbeat_interval),
    ] {
        if value.is_zero() {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    for (name, value) in [
        ("operation-timeout-secs", timeouts.operation_timeout),
        ("global-timeout-secs", timeouts.global_timeout),
        ("heartbeat-interval-secs", timeouts.heartbeat_interval),
        ("grace-period-secs", timeouts.grace_period),
    ] {
        if value > max {
            return Err(ConfigError::Validation(format!(
                "{} must be <= {}, got {}",
                name,
                MAX_TIMEOUT_SECS,
                value.as_secs()
            )));
        }
    }

    Ok(())
}
