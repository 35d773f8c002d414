use crate::error::{AppError, ErrorKind};
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Fraction of the capped delay used as the jitter band on either side
const JITTER_FRACTION: f64 = 0.25;

/// Which HTTP status codes are eligible for retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HttpStatusPolicy {
    /// Every HTTP error is retried
    #[default]
    All,
    /// Only 5xx responses and 429 are retried
    ServerErrors,
}

impl HttpStatusPolicy {
    /// Returns whether an HTTP error with `status` may be retried
    ///
    /// A missing status code is treated as retryable.
    pub fn allows(&self, status: Option<u16>) -> bool {
        match (self, status) {
            (Self::All, _) | (_, None) => true,
            (Self::ServerErrors, Some(code)) => code >= 500 || code == 429,
        }
    }
}

/// Retry behaviour for one class of operation
///
/// Built once and shared read-only. Use one of the presets and adjust with
/// the `with_*` methods.
///
/// # Delay Calculation
///
/// ```text
/// delay = min(initial_delay * backoff_factor^(attempt - 1), max_delay)
/// jitter: delay += uniform(-25%, +25%) of delay
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
    jitter: bool,
    retryable_kinds: Vec<ErrorKind>,
    overall_timeout: Option<Duration>,
    http_status_policy: HttpStatusPolicy,
}

impl Default for RetryConfig {
    /// General-purpose preset: 3 attempts, 100ms doubling up to 30s, 5 minute budget
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter: true,
            retryable_kinds: vec![ErrorKind::Network, ErrorKind::Timeout, ErrorKind::Http],
            overall_timeout: Some(Duration::from_secs(5 * 60)),
            http_status_policy: HttpStatusPolicy::All,
        }
    }
}

impl RetryConfig {
    /// Preset tuned for network fetches: 5 attempts, 200ms growing by 1.5x up to 10s
    pub fn network() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_factor: 1.5,
            overall_timeout: Some(Duration::from_secs(2 * 60)),
            ..Self::default()
        }
    }

    /// Preset for cheap operations: 2 attempts, no jitter, HTTP errors terminal
    pub fn quick() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            jitter: false,
            retryable_kinds: vec![ErrorKind::Network, ErrorKind::Timeout],
            overall_timeout: Some(Duration::from_secs(10)),
            http_status_policy: HttpStatusPolicy::All,
        }
    }

    /// Sets the maximum number of attempts, including the first (minimum 1)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_retryable_kinds(mut self, kinds: Vec<ErrorKind>) -> Self {
        self.retryable_kinds = kinds;
        self
    }

    /// Sets the budget for all attempts together; `None` disables it
    pub fn with_overall_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.overall_timeout = timeout;
        self
    }

    pub fn with_http_status_policy(mut self, policy: HttpStatusPolicy) -> Self {
        self.http_status_policy = policy;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    pub fn jitter(&self) -> bool {
        self.jitter
    }

    pub fn retryable_kinds(&self) -> &[ErrorKind] {
        &self.retryable_kinds
    }

    pub fn overall_timeout(&self) -> Option<Duration> {
        self.overall_timeout
    }

    pub fn http_status_policy(&self) -> HttpStatusPolicy {
        self.http_status_policy
    }

    /// Returns whether `err` may be retried under this configuration
    pub fn is_retryable(&self, err: &AppError) -> bool {
        if !err.is_retryable() || !self.retryable_kinds.contains(&err.kind()) {
            return false;
        }

        if err.kind() == ErrorKind::Http {
            return self.http_status_policy.allows(err.status_code());
        }

        true
    }

    /// Calculates the delay to sleep after the failed `attempt` (1-indexed)
    ///
    /// The cap is applied before jitter, so a jittered delay never exceeds
    /// `max_delay * 1.25`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let capped = self.base_delay_nanos(attempt);

        if !self.jitter {
            return Duration::from_nanos(capped as u64);
        }

        let band = capped * JITTER_FRACTION;
        let offset = if band > 0.0 {
            rand::thread_rng().gen_range(-band..=band)
        } else {
            0.0
        };

        let jittered = capped + offset;
        if jittered < 0.0 {
            self.initial_delay
        } else {
            Duration::from_nanos(jittered as u64)
        }
    }

    fn base_delay_nanos(&self, attempt: u32) -> f64 {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay.as_nanos() as f64 * self.backoff_factor.powi(exponent);
        let max = self.max_delay.as_nanos() as f64;
        if delay.is_finite() {
            delay.min(max)
        } else {
            max
        }
    }
}
