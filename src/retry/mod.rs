//! Retry executor with exponential backoff and jitter
//!
//! [`retry`] drives an attempt function until it succeeds, hits a terminal
//! error, runs out of attempts, or is cancelled. Cancellation and the
//! overall retry budget are observed before every attempt, while an attempt
//! is running, and while sleeping between attempts; all three report a
//! [`ErrorKind::Timeout`](crate::error::ErrorKind::Timeout) error.
//!
//! # Example
//!
//! ```no_run
//! use jsfinder::error::AppError;
//! use jsfinder::retry::{retry, RetryConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let token = CancellationToken::new();
//! let result = retry(&token, &RetryConfig::quick(), |attempt, _token| async move {
//!     if attempt < 2 {
//!         Err(AppError::network("connection reset"))
//!     } else {
//!         Ok("body")
//!     }
//! })
//! .await;
//! assert!(result.succeeded);
//! # }
//! ```

mod config;

pub use config::{HttpStatusPolicy, RetryConfig};

use crate::error::AppError;
use crate::timeout::{deadline_after, deadline_reached};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Outcome of one [`retry`] invocation
#[derive(Debug)]
pub struct RetryResult<T> {
    /// Value produced by the successful attempt
    pub value: Option<T>,

    /// Whether an attempt succeeded
    pub succeeded: bool,

    /// Number of attempts actually started
    pub attempts_made: u32,

    /// Wall time spent inside the executor
    pub elapsed: Duration,

    /// The error that ended the loop, if it did not succeed
    pub last_error: Option<AppError>,

    /// Every error seen, in order
    pub all_errors: Vec<AppError>,
}

impl<T> RetryResult<T> {
    fn new(capacity: u32) -> Self {
        Self {
            value: None,
            succeeded: false,
            attempts_made: 0,
            elapsed: Duration::ZERO,
            last_error: None,
            all_errors: Vec::with_capacity(capacity as usize),
        }
    }

    /// Converts into a plain `Result`, keeping the value or the last error
    pub fn into_result(self) -> Result<T, AppError> {
        match (self.value, self.last_error) {
            (Some(value), _) => Ok(value),
            (None, Some(err)) => Err(err),
            (None, None) => Err(AppError::unknown("retry finished without a result")),
        }
    }
}

fn push_error<T>(result: &mut RetryResult<T>, err: AppError) {
    result.all_errors.push(err.clone());
    result.last_error = Some(err);
}

fn finish<T>(mut result: RetryResult<T>, started: Instant) -> RetryResult<T> {
    result.elapsed = started.elapsed();
    result
}

fn interrupted(token: &CancellationToken, deadline: Option<Instant>) -> bool {
    token.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d)
}

/// Executes `attempt_fn` under `config`, observing `token` for cancellation
///
/// `attempt_fn` receives the 1-indexed attempt number and a token that is
/// cancelled when the executor gives up. Errors whose kind or flag make them
/// terminal stop the loop at once; retryable errors are followed by a
/// backoff sleep unless the attempt was the last one.
pub async fn retry<T, F, Fut>(
    token: &CancellationToken,
    config: &RetryConfig,
    mut attempt_fn: F,
) -> RetryResult<T>
where
    F: FnMut(u32, CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let started = Instant::now();
    let scope = token.child_token();
    let _guard = scope.clone().drop_guard();
    let deadline = config
        .overall_timeout()
        .and_then(|budget| deadline_after(started, budget));
    let mut result = RetryResult::new(config.max_attempts());

    for attempt in 1..=config.max_attempts() {
        if interrupted(&scope, deadline) {
            push_error(
                &mut result,
                AppError::timeout("retry operation cancelled or timed out"),
            );
            return finish(result, started);
        }

        result.attempts_made = attempt;

        let outcome = tokio::select! {
            biased;
            _ = scope.cancelled() => None,
            _ = deadline_reached(deadline) => None,
            outcome = attempt_fn(attempt, scope.clone()) => Some(outcome),
        };

        let err = match outcome {
            Some(Ok(value)) => {
                tracing::debug!(attempt, "operation succeeded");
                result.value = Some(value);
                result.succeeded = true;
                result.last_error = None;
                return finish(result, started);
            }
            Some(Err(err)) => err,
            None => {
                push_error(
                    &mut result,
                    AppError::timeout("retry operation cancelled or timed out during attempt")
                        .with_context("attempt", attempt),
                );
                return finish(result, started);
            }
        };

        if !config.is_retryable(&err) {
            tracing::debug!(attempt, error = %err, "non-retryable error");
            push_error(&mut result, err);
            return finish(result, started);
        }

        if attempt == config.max_attempts() {
            tracing::debug!(attempt, error = %err, "max attempts reached, giving up");
            push_error(&mut result, err);
            break;
        }

        let delay = config.delay_for_attempt(attempt);
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "attempt failed, retrying"
        );
        push_error(&mut result, err);

        let slept = tokio::select! {
            biased;
            _ = scope.cancelled() => false,
            _ = deadline_reached(deadline) => false,
            _ = tokio::time::sleep(delay) => true,
        };

        if !slept {
            push_error(
                &mut result,
                AppError::timeout("retry operation cancelled or timed out during delay")
                    .with_context("attempt", attempt),
            );
            return finish(result, started);
        }
    }

    finish(result, started)
}

/// Aggregate statistics over many [`RetryResult`]s
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryStats {
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub total_attempts: u64,
    pub total_retries: u64,
    pub max_attempts: u32,
    pub max_elapsed: Duration,
}

impl RetryStats {
    /// Folds one result into the statistics
    pub fn record<T>(&mut self, result: &RetryResult<T>) {
        self.total_operations += 1;
        self.total_attempts += u64::from(result.attempts_made);

        if result.succeeded {
            self.successful_operations += 1;
        } else {
            self.failed_operations += 1;
        }

        self.total_retries += u64::from(result.attempts_made.saturating_sub(1));
        self.max_attempts = self.max_attempts.max(result.attempts_made);
        self.max_elapsed = self.max_elapsed.max(result.elapsed);
    }

    /// Mean attempts per operation
    pub fn average_attempts(&self) -> f64 {
        if self.total_operations == 0 {
            return 0.0;
        }
        self.total_attempts as f64 / self.total_operations as f64
    }

    /// Percentage of operations that succeeded
    pub fn success_rate(&self) -> f64 {
        if self.total_operations == 0 {
            return 0.0;
        }
        self.successful_operations as f64 / self.total_operations as f64 * 100.0
    }
}

impl fmt::Display for RetryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ops ({:.1}% success), avg {:.1} attempts, max {} attempts, max time {:?}",
            self.total_operations,
            self.success_rate(),
            self.average_attempts(),
            self.max_attempts,
            self.max_elapsed
        )
    }
}
