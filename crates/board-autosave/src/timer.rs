//! Single-shot timers
//!
//! The driver arms exactly one timer at a time. [`Timer`] is the platform
//! seam; [`TokioTimer`] is the default backed by a spawned task.

use futures::future::BoxFuture;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Single-shot delayed task scheduler
pub trait Timer: Send + Sync {
    /// Run `task` once after `delay`
    fn arm(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle;
}

/// Handle to an armed timer
///
/// Dropping the handle does not cancel the timer; call [`cancel`](Self::cancel).
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    /// Handle that runs `cancel` when cancelled
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Handle around a tokio task
    #[must_use]
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self::new(move || task.abort())
    }

    /// Cancel the timer. A tokio task that already woke is aborted at its
    /// next await point.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// Timer backed by `tokio::time::sleep` in a spawned task
///
/// Must be armed from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn arm(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle {
        TimerHandle::from_task(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn flag_task(flag: &Arc<AtomicBool>) -> BoxFuture<'static, ()> {
        let flag = Arc::clone(flag);
        async move { flag.store(true, Ordering::SeqCst) }.boxed()
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let _handle = TokioTimer.arm(Duration::from_secs(20), flag_task(&fired));

        tokio::time::sleep(Duration::from_millis(19_999)).await;
        assert!(!fired.load(Ordering::SeqCst));
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let fired = Arc::new(AtomicBool::new(false));
        TokioTimer
            .arm(Duration::from_secs(1), flag_task(&fired))
            .cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
