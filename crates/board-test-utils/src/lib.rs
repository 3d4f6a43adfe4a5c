//! Testing utilities for the board workspace
//!
//! Shared test doubles for the platform collaborators.

#![allow(missing_docs)]

use board_activity::{
    ActivityMonitor, ActivityTracker, Clock, EventSource, LocalEventBus, MonitorConfig,
    STALENESS_THRESHOLD,
};
use board_autosave::{BoardSaver, SaveError, Timer, TimerHandle, TokioTimer};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// Monitor on a manual clock with the default threshold
pub fn manual_monitor(visible: bool) -> (ActivityMonitor, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let monitor = ActivityMonitor::new(clock.clone(), visible, STALENESS_THRESHOLD);
    (monitor, clock)
}

/// Tracker attached to a fresh bus with the default config
pub fn attached_tracker(
    hidden: bool,
    clock: Arc<dyn Clock>,
) -> (ActivityTracker, Arc<LocalEventBus>) {
    let bus = Arc::new(LocalEventBus::new(hidden));
    let source: Arc<dyn EventSource> = bus.clone();
    let tracker = ActivityTracker::attach(source, clock, MonitorConfig::default());
    (tracker, bus)
}

/// Saver that records calls and can fail or take time on demand
#[derive(Debug, Default)]
pub struct RecordingSaver {
    calls: AtomicUsize,
    completed: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingSaver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let saver = Self::new();
        saver.set_failing(true);
        saver
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        let saver = Self::new();
        *saver.delay.lock() = Some(delay);
        saver
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Saves started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Saves that ran to completion, successful or not
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BoardSaver for RecordingSaver {
    async fn save(&self) -> Result<(), SaveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(SaveError::Unavailable("test backend offline".into()))
        } else {
            Ok(())
        }
    }
}

/// Tokio timer that counts what the driver does with it
#[derive(Debug, Default)]
pub struct CountingTimer {
    armed: AtomicUsize,
    fired: Arc<AtomicUsize>,
    cancelled: Arc<AtomicUsize>,
    pending: Arc<AtomicUsize>,
    max_pending: Arc<AtomicUsize>,
}

impl CountingTimer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn armed(&self) -> usize {
        self.armed.load(Ordering::SeqCst)
    }

    pub fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Timers armed but neither fired nor cancelled
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Highest simultaneous pending count seen
    pub fn max_pending(&self) -> usize {
        self.max_pending.load(Ordering::SeqCst)
    }
}

impl Timer for CountingTimer {
    fn arm(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle {
        self.armed.fetch_add(1, Ordering::SeqCst);
        let now_pending = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_pending.fetch_max(now_pending, Ordering::SeqCst);

        // Whichever of fire or cancel happens first settles the timer.
        let settled = Arc::new(AtomicBool::new(false));

        let on_fire = {
            let settled = Arc::clone(&settled);
            let pending = Arc::clone(&self.pending);
            let fired = Arc::clone(&self.fired);
            async move {
                if !settled.swap(true, Ordering::SeqCst) {
                    pending.fetch_sub(1, Ordering::SeqCst);
                    fired.fetch_add(1, Ordering::SeqCst);
                }
                task.await;
            }
            .boxed()
        };
        let inner = TokioTimer.arm(delay, on_fire);

        let pending = Arc::clone(&self.pending);
        let cancelled = Arc::clone(&self.cancelled);
        TimerHandle::new(move || {
            inner.cancel();
            if !settled.swap(true, Ordering::SeqCst) {
                pending.fetch_sub(1, Ordering::SeqCst);
                cancelled.fetch_add(1, Ordering::SeqCst);
            }
        })
    }
}
