//! Activity monitor
//!
//! Holds the [`ActivityState`] for a board session and applies the two
//! mutations input observers are allowed to make:
//! - `record_activity` stamps fresh input, but only while the tab is visible
//! - `set_visible` follows the tab, treating a return to the foreground as
//!   fresh input

use crate::clock::Clock;
use crate::liveness::{self, LivenessProbe};
use crate::state::ActivityState;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Activity monitor for one board session
pub struct ActivityMonitor {
    clock: Arc<dyn Clock>,
    staleness_threshold: Duration,
    state: Mutex<ActivityState>,
}

impl ActivityMonitor {
    /// Create a monitor stamped at the current instant
    ///
    /// # Arguments
    /// * `clock` - Time source
    /// * `visible` - Current tab visibility
    /// * `staleness_threshold` - Window in which activity counts as recent
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, visible: bool, staleness_threshold: Duration) -> Self {
        let state = ActivityState::new(clock.now(), visible);
        Self {
            clock,
            staleness_threshold,
            state: Mutex::new(state),
        }
    }

    /// Record user input. Ignored while the tab is hidden.
    pub fn record_activity(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if !state.is_tab_visible {
            trace!("ignoring activity in hidden tab");
            return;
        }
        state.last_activity = now;
        state.is_active = true;
    }

    /// Follow a tab visibility change
    pub fn set_visible(&self, visible: bool) {
        let became_visible = {
            let mut state = self.state.lock();
            let was_visible = state.is_tab_visible;
            state.is_tab_visible = visible;
            !was_visible && visible
        };
        debug!(visible, "tab visibility changed");
        if became_visible {
            self.record_activity();
        }
    }

    /// Copy of the current state
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> ActivityState {
        *self.state.lock()
    }

    /// Time since the last recorded activity
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.snapshot().idle_for(self.clock.now())
    }

    /// Configured staleness threshold
    #[inline]
    #[must_use]
    pub fn staleness_threshold(&self) -> Duration {
        self.staleness_threshold
    }

    /// Whether the tab is visible and input was seen within the threshold
    #[must_use]
    pub fn is_live_and_visible(&self) -> bool {
        let state = self.snapshot();
        liveness::is_live_and_visible(&state, self.clock.now(), self.staleness_threshold)
    }
}

impl LivenessProbe for ActivityMonitor {
    fn is_live_and_visible(&self) -> bool {
        ActivityMonitor::is_live_and_visible(self)
    }
}

impl std::fmt::Debug for ActivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityMonitor")
            .field("staleness_threshold", &self.staleness_threshold)
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use crate::liveness::STALENESS_THRESHOLD;
    use pretty_assertions::assert_eq;

    fn monitor(visible: bool) -> ActivityMonitor {
        ActivityMonitor::new(Arc::new(TokioClock), visible, STALENESS_THRESHOLD)
    }

    #[tokio::test(start_paused = true)]
    async fn record_updates_timestamp_when_visible() {
        let monitor = monitor(true);
        let before = monitor.snapshot().last_activity;

        tokio::time::advance(Duration::from_secs(3)).await;
        monitor.record_activity();

        let after = monitor.snapshot();
        assert_eq!(after.last_activity - before, Duration::from_secs(3));
        assert!(after.is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn record_ignored_when_hidden() {
        let monitor = monitor(false);
        let before = monitor.snapshot();

        tokio::time::advance(Duration::from_secs(3)).await;
        monitor.record_activity();

        assert_eq!(monitor.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn becoming_visible_counts_as_activity() {
        let monitor = monitor(false);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!monitor.is_live_and_visible());

        monitor.set_visible(true);

        assert!(monitor.is_live_and_visible());
        assert_eq!(monitor.idle_for(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn hiding_keeps_timestamp() {
        let monitor = monitor(true);
        let stamp = monitor.snapshot().last_activity;

        tokio::time::advance(Duration::from_secs(2)).await;
        monitor.set_visible(false);

        let state = monitor.snapshot();
        assert_eq!(state.last_activity, stamp);
        assert!(!state.is_tab_visible);
        assert!(!monitor.is_live_and_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn visible_to_visible_does_not_restamp() {
        let monitor = monitor(true);
        let stamp = monitor.snapshot().last_activity;

        tokio::time::advance(Duration::from_secs(2)).await;
        monitor.set_visible(true);

        assert_eq!(monitor.snapshot().last_activity, stamp);
    }

    #[tokio::test(start_paused = true)]
    async fn goes_stale_after_threshold() {
        let monitor = monitor(true);
        tokio::time::advance(Duration::from_millis(29_999)).await;
        assert!(monitor.is_live_and_visible());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!monitor.is_live_and_visible());
    }
}
