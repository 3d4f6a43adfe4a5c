//! Periodic persistence driver
//!
//! Drives a [`BoardSaver`] on a fixed cadence, gated by a [`LivenessProbe`].
//!
//! # State machine
//!
//! ```text
//! Armed --timer fires--> Ticking --save resolves (any outcome)--> Armed
//!   \                       /
//!    `------ stop() -------'----> Stopped (terminal)
//! ```
//!
//! At most one timer is pending at any time. A tick re-arms only after its
//! save attempt finishes, and never once the driver is stopped, so a save
//! still in flight at teardown cannot schedule another tick.

use crate::error::{AutosaveError, SaveError};
use crate::saver::BoardSaver;
use crate::timer::{Timer, TimerHandle, TokioTimer};
use board_activity::LivenessProbe;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument, Span};

/// Driver lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    /// Timer pending
    Armed,
    /// Tick running, no timer pending
    Ticking,
    /// Torn down
    Stopped,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// User was live and the save succeeded
    Saved,
    /// User was live and the save failed
    Failed,
    /// User idle or tab hidden, no save attempted
    Skipped,
}

/// Driver counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriverStats {
    /// Timer-driven ticks run
    pub ticks: u64,
    /// Successful saves, including `save_now`
    pub saves_succeeded: u64,
    /// Failed saves, including `save_now`
    pub saves_failed: u64,
    /// Ticks skipped for lack of liveness
    pub skipped: u64,
    /// Timers armed, including the initial one
    pub timers_armed: u64,
    /// Outcome of the most recent tick
    pub last_outcome: Option<TickOutcome>,
    /// Wall-clock time of the most recent successful save
    pub last_saved_at: Option<DateTime<Utc>>,
}

struct Schedule {
    state: DriverState,
    pending: Option<TimerHandle>,
}

struct DriverInner {
    interval: Duration,
    probe: Arc<dyn LivenessProbe>,
    saver: Arc<dyn BoardSaver>,
    timer: Arc<dyn Timer>,
    span: Span,
    schedule: Mutex<Schedule>,
    stats: Mutex<DriverStats>,
}

/// Periodic persistence driver
///
/// Stops when dropped.
pub struct PersistenceDriver {
    inner: Arc<DriverInner>,
}

impl PersistenceDriver {
    /// Start a driver on the tokio timer and arm its first tick.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        interval: Duration,
        probe: Arc<dyn LivenessProbe>,
        saver: Arc<dyn BoardSaver>,
    ) -> Self {
        Self::start_with_timer(interval, probe, saver, Arc::new(TokioTimer))
    }

    /// Start a driver on a custom timer and arm its first tick.
    ///
    /// Ticks run inside the tracing span current at this call.
    pub fn start_with_timer(
        interval: Duration,
        probe: Arc<dyn LivenessProbe>,
        saver: Arc<dyn BoardSaver>,
        timer: Arc<dyn Timer>,
    ) -> Self {
        let inner = Arc::new(DriverInner {
            interval,
            probe,
            saver,
            timer,
            span: Span::current(),
            schedule: Mutex::new(Schedule {
                state: DriverState::Armed,
                pending: None,
            }),
            stats: Mutex::new(DriverStats::default()),
        });
        debug!(?interval, "autosave driver started");
        inner.arm();
        Self { inner }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.inner.schedule.lock().state
    }

    /// Whether [`stop`](Self::stop) has been called
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state() == DriverState::Stopped
    }

    /// Delay between ticks
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Snapshot of the counters
    #[must_use]
    pub fn stats(&self) -> DriverStats {
        self.inner.stats.lock().clone()
    }

    /// Save immediately, bypassing liveness and leaving the schedule alone.
    ///
    /// # Errors
    /// - `AutosaveError::Stopped` after [`stop`](Self::stop)
    /// - `AutosaveError::Save` if the saver fails
    pub async fn save_now(&self) -> Result<(), AutosaveError> {
        if self.is_stopped() {
            return Err(AutosaveError::Stopped);
        }
        let result = self.inner.run_save().await;
        self.inner.record_save(&result);
        match result {
            Ok(()) => {
                info!("board saved on request");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "requested save failed");
                Err(e.into())
            }
        }
    }

    /// Cancel the pending timer and suppress every later re-arm.
    ///
    /// A save already in flight runs to completion. Calling it again is a
    /// no-op.
    pub fn stop(&self) {
        let pending = {
            let mut schedule = self.inner.schedule.lock();
            if schedule.state == DriverState::Stopped {
                return;
            }
            schedule.state = DriverState::Stopped;
            schedule.pending.take()
        };
        if let Some(handle) = pending {
            handle.cancel();
        }
        debug!("autosave driver stopped");
    }
}

impl Drop for PersistenceDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PersistenceDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceDriver")
            .field("interval", &self.inner.interval)
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish()
    }
}

impl DriverInner {
    /// Arm the next tick unless stopped. Returns whether a timer was armed.
    fn arm(self: &Arc<Self>) -> bool {
        let mut schedule = self.schedule.lock();
        if schedule.state == DriverState::Stopped {
            debug!("driver stopped, not re-arming");
            return false;
        }
        debug_assert!(schedule.pending.is_none(), "at most one pending timer");

        let weak = Arc::downgrade(self);
        let task = async move {
            if let Some(inner) = weak.upgrade() {
                inner.fire().await;
            }
        }
        .instrument(self.span.clone())
        .boxed();

        schedule.pending = Some(self.timer.arm(self.interval, task));
        schedule.state = DriverState::Armed;
        drop(schedule);

        self.stats.lock().timers_armed += 1;
        true
    }

    async fn fire(self: Arc<Self>) {
        {
            let mut schedule = self.schedule.lock();
            if schedule.state == DriverState::Stopped {
                return;
            }
            schedule.pending = None;
            schedule.state = DriverState::Ticking;
        }
        self.tick().await;
        self.arm();
    }

    async fn tick(&self) -> TickOutcome {
        let outcome = if self.probe.is_live_and_visible() {
            let result = self.run_save().await;
            self.record_save(&result);
            match result {
                Ok(()) => {
                    info!("board autosaved");
                    TickOutcome::Saved
                }
                Err(e) => {
                    warn!(error = %e, "autosave failed");
                    TickOutcome::Failed
                }
            }
        } else {
            debug!("user idle or tab hidden, skipping autosave");
            TickOutcome::Skipped
        };

        let mut stats = self.stats.lock();
        stats.ticks += 1;
        if outcome == TickOutcome::Skipped {
            stats.skipped += 1;
        }
        stats.last_outcome = Some(outcome);
        outcome
    }

    async fn run_save(&self) -> Result<(), SaveError> {
        AssertUnwindSafe(self.saver.save())
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(SaveError::Panicked(panic_message(panic.as_ref()))))
    }

    fn record_save(&self, result: &Result<(), SaveError>) {
        let mut stats = self.stats.lock();
        match result {
            Ok(()) => {
                stats.saves_succeeded += 1;
                stats.last_saved_at = Some(Utc::now());
            }
            Err(_) => stats.saves_failed += 1,
        }
    }
}

impl Drop for DriverInner {
    fn drop(&mut self) {
        if let Some(handle) = self.schedule.get_mut().pending.take() {
            handle.cancel();
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
