//! Trailing-edge throttle
//!
//! Bursts of calls inside one window collapse into a single invocation of the
//! action when the window expires. The throttle runs its own flush timer and
//! shares nothing with the persistence schedule.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

/// Default coalescing window for pointer movement
pub const POINTER_THROTTLE_WINDOW: Duration = Duration::from_millis(1_000);

/// Pending-flag bookkeeping, separate from any timer
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ThrottleGate {
    pending: bool,
    coalesced: u64,
}

impl ThrottleGate {
    /// Open a window. Returns true only for the call that must schedule the
    /// flush; calls while a window is open are absorbed.
    pub fn try_begin(&mut self) -> bool {
        if self.pending {
            self.coalesced += 1;
            false
        } else {
            self.pending = true;
            true
        }
    }

    /// Close the window, returning how many calls were absorbed into it
    pub fn finish(&mut self) -> u64 {
        self.pending = false;
        std::mem::take(&mut self.coalesced)
    }

    /// Whether a flush is scheduled
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Throttled action with a scheduled flush
pub struct Throttle {
    window: Duration,
    gate: Arc<Mutex<ThrottleGate>>,
    action: Arc<dyn Fn() + Send + Sync>,
    flush: Mutex<Option<JoinHandle<()>>>,
    cancelled: AtomicBool,
}

impl Throttle {
    /// Create a throttle around `action`
    pub fn new(window: Duration, action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            window,
            gate: Arc::new(Mutex::new(ThrottleGate::default())),
            action: Arc::new(action),
            flush: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Request the action. Runs it at the end of the current window.
    pub fn call(&self) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        if !self.gate.lock().try_begin() {
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("throttle called outside a tokio runtime, running action immediately");
            self.gate.lock().finish();
            (self.action)();
            return;
        };

        // cancel() sets the flag before taking this lock, so either it sees
        // the stored handle or this sees the flag.
        let mut flush = self.flush.lock();
        if self.cancelled.load(Ordering::SeqCst) {
            self.gate.lock().finish();
            return;
        }

        let gate = Arc::clone(&self.gate);
        let action = Arc::clone(&self.action);
        let window = self.window;
        *flush = Some(runtime.spawn(async move {
            tokio::time::sleep(window).await;
            let coalesced = gate.lock().finish();
            trace!(coalesced, "throttle window flushed");
            action();
        }));
    }

    /// Drop any scheduled flush and ignore all later calls
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(handle) = self.flush.lock().take() {
            handle.abort();
        }
        self.gate.lock().finish();
    }

    /// Whether a flush is scheduled
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.gate.lock().is_pending()
    }

    /// Coalescing window
    #[inline]
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("window", &self.window)
            .field("pending", &self.is_pending())
            .field("cancelled", &self.cancelled.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(window: Duration) -> (Throttle, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let throttle = Throttle::new(window, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (throttle, count)
    }

    #[test]
    fn gate_absorbs_until_finished() {
        let mut gate = ThrottleGate::default();
        assert!(gate.try_begin());
        assert!(!gate.try_begin());
        assert!(!gate.try_begin());
        assert_eq!(gate.finish(), 2);
        assert!(gate.try_begin());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_flushes_once_at_window_end() {
        let (throttle, count) = counting(POINTER_THROTTLE_WINDOW);
        for _ in 0..100 {
            throttle.call();
            tokio::time::advance(Duration::from_millis(5)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(POINTER_THROTTLE_WINDOW).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!throttle.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn next_window_opens_after_flush() {
        let (throttle, count) = counting(Duration::from_millis(100));
        throttle.call();
        tokio::time::sleep(Duration::from_millis(150)).await;
        throttle.call();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_flush() {
        let (throttle, count) = counting(Duration::from_millis(100));
        throttle.call();
        throttle.cancel();
        throttle.call();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancel_racing_call_leaves_nothing_scheduled() {
        let mut trials = Vec::with_capacity(500);
        for _ in 0..500 {
            let (throttle, count) = counting(Duration::from_millis(50));
            let throttle = Arc::new(throttle);
            let barrier = Arc::new(tokio::sync::Barrier::new(2));

            let caller = {
                let throttle = Arc::clone(&throttle);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    throttle.call();
                })
            };
            let canceller = {
                let throttle = Arc::clone(&throttle);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    throttle.cancel();
                })
            };
            caller.await.unwrap();
            canceller.await.unwrap();

            trials.push((throttle, count));
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        let flushed = trials
            .iter()
            .filter(|(_, count)| count.load(Ordering::SeqCst) > 0)
            .count();
        assert_eq!(flushed, 0);
    }

    #[test]
    fn without_runtime_runs_inline() {
        let (throttle, count) = counting(Duration::from_millis(100));
        throttle.call();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!throttle.is_pending());
    }
}
