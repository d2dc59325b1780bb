//! Readiness barrier
//!
//! Each watcher started during a reconciliation pass registers one
//! [`ReadyLatch`]. The pass then waits until every latch has been released or
//! the timeout elapses. A latch releases the barrier at most once no matter
//! how many readiness reports its watcher emits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;

/// Counter of watchers that have not reported readiness yet
#[derive(Clone)]
pub struct ReadinessBarrier {
    pending: Arc<watch::Sender<usize>>,
}

impl ReadinessBarrier {
    pub fn new() -> Self {
        let (pending, _) = watch::channel(0);
        Self {
            pending: Arc::new(pending),
        }
    }

    /// Add one pending watcher
    pub fn register(&self) -> ReadyLatch {
        self.pending.send_modify(|n| *n += 1);
        ReadyLatch {
            pending: self.pending.clone(),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Wait until nothing is pending. On timeout returns the number of
    /// watchers still pending; they are left running.
    pub async fn wait(&self, timeout: Duration) -> Result<(), usize> {
        let mut rx = self.pending.subscribe();
        let ready = tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0))
            .await
            .is_ok();
        if ready { Ok(()) } else { Err(self.pending()) }
    }
}

impl Default for ReadinessBarrier {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-fire release handle of one pending watcher
#[derive(Clone)]
pub struct ReadyLatch {
    pending: Arc<watch::Sender<usize>>,
    released: Arc<AtomicBool>,
}

impl ReadyLatch {
    /// Release the barrier for this watcher. Returns `false` if it was
    /// already released.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.pending.send_modify(|n| *n = n.saturating_sub(1));
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_barrier_is_ready() {
        let barrier = ReadinessBarrier::new();
        assert_eq!(barrier.wait(Duration::from_millis(10)).await, Ok(()));
    }

    #[tokio::test]
    async fn test_latch_releases_once() {
        let barrier = ReadinessBarrier::new();
        let a = barrier.register();
        let _b = barrier.register();
        assert_eq!(barrier.pending(), 2);

        assert!(!a.is_released());
        assert!(a.release());
        assert!(a.is_released());
        assert!(!a.release());
        assert!(!a.clone().release());
        assert_eq!(barrier.pending(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_with_pending_count() {
        let barrier = ReadinessBarrier::new();
        let a = barrier.register();
        let _b = barrier.register();
        a.release();

        assert_eq!(barrier.wait(Duration::from_secs(60)).await, Err(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_resolves_when_released_concurrently() {
        let barrier = ReadinessBarrier::new();
        let latches: Vec<ReadyLatch> = (0..3).map(|_| barrier.register()).collect();

        for (i, latch) in latches.into_iter().enumerate() {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(i as u64 + 1)).await;
                latch.release();
                latch.release();
            });
        }

        assert_eq!(barrier.wait(Duration::from_secs(60)).await, Ok(()));
        assert_eq!(barrier.pending(), 0);
    }
}
