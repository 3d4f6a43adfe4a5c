//! Activity state owned by the monitor

use tokio::time::Instant;

/// Liveness signals for one board session.
///
/// Only [`ActivityMonitor`](crate::ActivityMonitor) mutates this; everyone
/// else reads copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityState {
    /// Last time qualifying input was recorded
    pub last_activity: Instant,
    /// Whether the board's tab is in the foreground
    pub is_tab_visible: bool,
    /// Set whenever activity is recorded
    pub is_active: bool,
}

impl ActivityState {
    /// Fresh state stamped at `now`
    #[inline]
    #[must_use]
    pub fn new(now: Instant, is_tab_visible: bool) -> Self {
        Self {
            last_activity: now,
            is_tab_visible,
            is_active: true,
        }
    }

    /// Time elapsed since the last recorded activity
    #[inline]
    #[must_use]
    pub fn idle_for(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.last_activity)
    }
}
