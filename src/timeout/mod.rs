//! Timeout and operation management
//!
//! This module separates two budgets:
//! - how long a single network operation may take (per-operation deadline)
//! - how long the whole program may run (global deadline)
//!
//! Every operation gets a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! that is a child of the global token, a monitor task that enforces its
//! deadline, and a heartbeat channel used as a liveness signal for long
//! running work.

mod manager;
mod operation;

pub use manager::TimeoutManager;
pub use operation::{Operation, OperationOutcome};

use std::time::Duration;
use tokio::time::Instant;

/// Timeout budgets used by a [`TimeoutManager`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Default deadline for a single operation
    pub operation_timeout: Duration,

    /// Deadline for everything the manager runs
    pub global_timeout: Duration,

    /// Expected spacing between heartbeats
    ///
    /// An operation without a heartbeat for twice this interval is reported
    /// as stale.
    pub heartbeat_interval: Duration,

    /// How long shutdown waits for monitors to drain
    pub grace_period: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(30),
            global_timeout: Duration::from_secs(5 * 60),
            heartbeat_interval: Duration::from_secs(5),
            grace_period: Duration::from_secs(10),
        }
    }
}

impl TimeoutConfig {
    /// Preset for plain HTTP work
    pub fn http() -> Self {
        Self {
            operation_timeout: Duration::from_secs(15),
            global_timeout: Duration::from_secs(2 * 60),
            heartbeat_interval: Duration::from_secs(3),
            grace_period: Duration::from_secs(5),
        }
    }

    /// Preset for crawling sessions
    pub fn crawler() -> Self {
        Self {
            operation_timeout: Duration::from_secs(20),
            global_timeout: Duration::from_secs(10 * 60),
            heartbeat_interval: Duration::from_secs(10),
            grace_period: Duration::from_secs(15),
        }
    }
}

/// The instant `timeout` after `start`
///
/// `None` when the sum is past what the clock can represent; callers treat
/// that as no deadline at all.
pub(crate) fn deadline_after(start: Instant, timeout: Duration) -> Option<Instant> {
    start.checked_add(timeout)
}

/// Completes at `deadline`, or never when there is none
pub(crate) async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
