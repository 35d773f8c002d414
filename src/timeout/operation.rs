use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How an operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Finished normally through `complete_operation`
    Completed,
    /// Cancelled explicitly, by its deadline, or by the global deadline
    Cancelled,
}

/// Handle to a managed operation
///
/// Cloning the handle is cheap. The manager owns the bookkeeping; the handle
/// only observes it.
#[derive(Debug, Clone)]
pub struct Operation {
    pub(super) id: String,
    pub(super) token: CancellationToken,
    pub(super) done: CancellationToken,
    pub(super) started_at: Instant,
    pub(super) timeout: Duration,
    pub(super) outcome: Arc<OnceLock<OperationOutcome>>,
}

impl Operation {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Token cancelled when the operation is cancelled, times out, or the
    /// global deadline passes
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the terminal outcome, or `None` while still open
    pub fn outcome(&self) -> Option<OperationOutcome> {
        self.outcome.get().copied()
    }

    pub fn is_finished(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Waits until the operation reaches a terminal state
    pub async fn finished(&self) {
        self.done.cancelled().await
    }
}

/// Manager-side state of an open operation
pub(super) struct OperationEntry {
    pub(super) seq: u64,
    pub(super) handle: Operation,
    pub(super) heartbeat: mpsc::Sender<()>,
}

impl OperationEntry {
    /// Performs the single terminal transition for this entry
    ///
    /// Callers remove the entry from the map first, so this runs at most once.
    pub(super) fn finish(&self, outcome: OperationOutcome) {
        let _ = self.handle.outcome.set(outcome);
        self.handle.token.cancel();
        self.handle.done.cancel();
    }
}
