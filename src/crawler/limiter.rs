//! Global concurrency limiting for page fetches
//!
//! One semaphore bounds every in-flight fetch of a crawler. The limiter also
//! tracks the current and peak number of holders so tests and reports can
//! observe the bound. A permit can additionally count against a caller's own
//! [`InFlightCounter`], which is how a crawl session reports its share.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Counting semaphore with in-flight instrumentation
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    width: usize,
    counter: Arc<InFlightCounter>,
}

/// Current and peak number of held permits
#[derive(Debug, Default)]
pub struct InFlightCounter {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A held fetch slot; released on drop
#[derive(Debug)]
pub struct FetchPermit {
    _permit: OwnedSemaphorePermit,
    global: Arc<InFlightCounter>,
    local: Option<Arc<InFlightCounter>>,
}

impl ConcurrencyLimiter {
    pub fn new(width: usize) -> Self {
        let width = width.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(width)),
            width,
            counter: Arc::new(InFlightCounter::new()),
        }
    }

    /// Waits for a slot, giving up when `cancel` fires
    ///
    /// Returns `None` if cancelled or the limiter was closed.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Option<FetchPermit> {
        self.acquire_counted(cancel, None).await
    }

    /// Like [`acquire`](Self::acquire), also counting the permit in `local`
    /// while it is held
    pub async fn acquire_counted(
        &self,
        cancel: &CancellationToken,
        local: Option<&Arc<InFlightCounter>>,
    ) -> Option<FetchPermit> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok()?,
        };

        self.counter.enter();
        if let Some(local) = local {
            local.enter();
        }

        Some(FetchPermit {
            _permit: permit,
            global: Arc::clone(&self.counter),
            local: local.cloned(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn in_flight(&self) -> usize {
        self.counter.current()
    }

    /// Highest number of simultaneous holders seen so far
    pub fn peak(&self) -> usize {
        self.counter.peak()
    }
}

impl Drop for FetchPermit {
    fn drop(&mut self) {
        self.global.exit();
        if let Some(local) = &self.local {
            local.exit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let limiter = ConcurrencyLimiter::new(2);
        let token = CancellationToken::new();

        let a = limiter.acquire(&token).await.unwrap();
        let b = limiter.acquire(&token).await.unwrap();
        assert_eq!(limiter.in_flight(), 2);

        drop(a);
        assert_eq!(limiter.in_flight(), 1);
        drop(b);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.peak(), 2);
    }

    #[tokio::test]
    async fn test_zero_width_is_one() {
        let limiter = ConcurrencyLimiter::new(0);
        assert_eq!(limiter.width(), 1);
    }

    #[tokio::test]
    async fn test_wait_is_cancellable() {
        let limiter = ConcurrencyLimiter::new(1);
        let token = CancellationToken::new();
        let _held = limiter.acquire(&token).await.unwrap();

        let waiter_token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waiter_token.cancel();
        });

        let result = tokio::time::timeout(Duration::from_secs(2), limiter.acquire(&token)).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_peak_never_exceeds_width() {
        let limiter = Arc::new(ConcurrencyLimiter::new(3));
        let token = CancellationToken::new();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..12 {
            let limiter = Arc::clone(&limiter);
            let token = token.clone();
            tasks.spawn(async move {
                let _permit = limiter.acquire(&token).await.unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
        while tasks.join_next().await.is_some() {}

        assert!(limiter.peak() <= 3);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_local_counter_tracks_its_own_permits() {
        let limiter = ConcurrencyLimiter::new(4);
        let token = CancellationToken::new();
        let session = Arc::new(InFlightCounter::new());

        let a = limiter.acquire_counted(&token, Some(&session)).await.unwrap();
        let b = limiter.acquire_counted(&token, Some(&session)).await.unwrap();
        let other = limiter.acquire(&token).await.unwrap();

        assert_eq!(limiter.in_flight(), 3);
        assert_eq!(session.current(), 2);

        drop(a);
        drop(other);
        assert_eq!(session.current(), 1);
        drop(b);

        assert_eq!(session.current(), 0);
        assert_eq!(session.peak(), 2);
        assert_eq!(limiter.peak(), 3);
    }
}
