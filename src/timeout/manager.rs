use super::operation::{Operation, OperationEntry, OperationOutcome};
use super::{deadline_after, deadline_reached, TimeoutConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, Span};

/// Tracks open operations under one global deadline
///
/// Cloning the manager shares the same state. Construction spawns the global
/// deadline monitor, so it must happen inside a Tokio runtime.
#[derive(Clone)]
pub struct TimeoutManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: TimeoutConfig,
    operations: Mutex<HashMap<String, OperationEntry>>,
    global: CancellationToken,
    monitors: TaskTracker,
    next_seq: AtomicU64,
    started_at: Instant,
    span: Span,
}

impl TimeoutManager {
    /// Creates a manager whose global deadline starts now
    pub fn new(config: TimeoutConfig) -> Self {
        let span = tracing::info_span!("timeouts");
        let inner = Arc::new(Inner {
            config,
            operations: Mutex::new(HashMap::new()),
            global: CancellationToken::new(),
            monitors: TaskTracker::new(),
            next_seq: AtomicU64::new(0),
            started_at: Instant::now(),
            span,
        });

        let monitor = Arc::clone(&inner);
        inner
            .monitors
            .spawn(monitor_global(monitor).instrument(inner.span.clone()));

        Self { inner }
    }

    /// The process-wide token every operation token derives from
    pub fn global_token(&self) -> CancellationToken {
        self.inner.global.clone()
    }

    /// Time since the manager was created
    pub fn uptime(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    /// Opens an operation with `timeout` or the configured default
    ///
    /// An operation still open under the same `id` is cancelled first.
    pub fn create_operation(&self, id: impl Into<String>, timeout: Option<Duration>) -> Operation {
        let id = id.into();
        let timeout = timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(self.inner.config.operation_timeout);
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let (heartbeat_tx, heartbeat_rx) = mpsc::channel(1);

        let handle = Operation {
            id: id.clone(),
            token: self.inner.global.child_token(),
            done: CancellationToken::new(),
            started_at: Instant::now(),
            timeout,
            outcome: Arc::new(OnceLock::new()),
        };

        let replaced = self.inner.lock_operations().insert(
            id.clone(),
            OperationEntry {
                seq,
                handle: handle.clone(),
                heartbeat: heartbeat_tx,
            },
        );

        if let Some(previous) = replaced {
            tracing::warn!(parent: &self.inner.span, operation = %id, "Replacing operation that was still open");
            previous.finish(OperationOutcome::Cancelled);
        }

        self.inner.monitors.spawn(
            monitor_operation(Arc::clone(&self.inner), seq, handle.clone(), heartbeat_rx)
                .instrument(self.inner.span.clone()),
        );

        tracing::debug!(parent: &self.inner.span, operation = %id, ?timeout, "Created operation");
        handle
    }

    /// Marks an operation as completed
    ///
    /// Returns `false` if the operation was already finished or unknown.
    pub fn complete_operation(&self, id: &str) -> bool {
        let Some(entry) = self.inner.lock_operations().remove(id) else {
            return false;
        };

        entry.finish(OperationOutcome::Completed);
        tracing::debug!(
            parent: &self.inner.span,
            operation = %id,
            elapsed = ?entry.handle.started_at.elapsed(),
            "Completed operation"
        );
        true
    }

    /// Cancels an operation
    ///
    /// Returns `false` if the operation was already finished or unknown.
    pub fn cancel_operation(&self, id: &str) -> bool {
        if self.inner.cancel(id, None) {
            tracing::warn!(parent: &self.inner.span, operation = %id, "Cancelled operation");
            true
        } else {
            false
        }
    }

    /// Records a heartbeat for an operation without ever blocking
    pub fn send_heartbeat(&self, id: &str) {
        let operations = self.inner.lock_operations();
        if let Some(entry) = operations.get(id) {
            // A full slot already signals liveness
            let _ = entry.heartbeat.try_send(());
        }
    }

    /// Returns the token of an open operation
    pub fn operation_token(&self, id: &str) -> Option<CancellationToken> {
        self.inner
            .lock_operations()
            .get(id)
            .map(|entry| entry.handle.token.clone())
    }

    /// Number of operations still open
    pub fn active_operations(&self) -> usize {
        self.inner.lock_operations().len()
    }

    /// Cancels every operation and the global token, then waits up to the
    /// grace period for monitors to exit
    pub async fn shutdown(&self) {
        for id in self.inner.cancel_all() {
            tracing::debug!(parent: &self.inner.span, operation = %id, "Shutdown operation");
        }
        self.inner.global.cancel();
        self.inner.monitors.close();

        let grace = self.inner.config.grace_period;
        if tokio::time::timeout(grace, self.inner.monitors.wait())
            .await
            .is_err()
        {
            tracing::warn!(parent: &self.inner.span, ?grace, "Monitors still running after grace period");
        }

        tracing::info!(
            parent: &self.inner.span,
            uptime = ?self.uptime(),
            "Timeout manager shutdown completed"
        );
    }
}

impl Inner {
    fn lock_operations(&self) -> MutexGuard<'_, HashMap<String, OperationEntry>> {
        // Entries stay consistent even if a holder panicked
        self.operations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cancels `id`; with `seq` set, only if it is still that instance
    fn cancel(&self, id: &str, seq: Option<u64>) -> bool {
        let entry = {
            let mut operations = self.lock_operations();
            match operations.get(id) {
                Some(entry) if seq.map_or(true, |s| s == entry.seq) => operations.remove(id),
                _ => None,
            }
        };

        match entry {
            Some(entry) => {
                entry.finish(OperationOutcome::Cancelled);
                true
            }
            None => false,
        }
    }

    fn cancel_all(&self) -> Vec<String> {
        let drained: Vec<(String, OperationEntry)> = self.lock_operations().drain().collect();
        drained
            .into_iter()
            .map(|(id, entry)| {
                entry.finish(OperationOutcome::Cancelled);
                id
            })
            .collect()
    }
}

async fn monitor_global(inner: Arc<Inner>) {
    let global_timeout = inner.config.global_timeout;
    let deadline = deadline_after(inner.started_at, global_timeout);

    tokio::select! {
        _ = inner.global.cancelled() => {}
        _ = deadline_reached(deadline) => {
            tracing::error!(?global_timeout, "Global timeout exceeded");
            let cancelled = inner.cancel_all();
            inner.global.cancel();
            tracing::warn!(operations = cancelled.len(), "Cancelled open operations");
        }
    }
}

async fn monitor_operation(
    inner: Arc<Inner>,
    seq: u64,
    op: Operation,
    mut heartbeats: mpsc::Receiver<()>,
) {
    let interval = inner.config.heartbeat_interval.max(Duration::from_millis(1));
    let stale_after = interval.saturating_mul(2);
    let deadline = deadline_after(op.started_at, op.timeout);
    let mut ticker = deadline_after(op.started_at, interval)
        .map(|first| tokio::time::interval_at(first, interval));
    let mut last_heartbeat = Instant::now();

    loop {
        tokio::select! {
            biased;

            _ = op.done.cancelled() => return,

            _ = deadline_reached(deadline) => {
                tracing::warn!(
                    operation = %op.id,
                    elapsed = ?op.started_at.elapsed(),
                    timeout = ?op.timeout,
                    "Operation timed out"
                );
                inner.cancel(&op.id, Some(seq));
                return;
            }

            _ = op.token.cancelled() => {
                tracing::debug!(operation = %op.id, "Operation token cancelled");
                inner.cancel(&op.id, Some(seq));
                return;
            }

            Some(()) = heartbeats.recv() => {
                last_heartbeat = Instant::now();
                tracing::trace!(operation = %op.id, "Received heartbeat");
            }

            _ = next_tick(&mut ticker) => {
                let silence = last_heartbeat.elapsed();
                if silence > stale_after {
                    tracing::warn!(operation = %op.id, ?silence, "No heartbeat received");
                }
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
