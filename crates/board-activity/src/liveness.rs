//! Liveness evaluation over recorded activity

use crate::state::ActivityState;
use std::time::Duration;
use tokio::time::Instant;

/// Activity older than this is not recent.
pub const STALENESS_THRESHOLD: Duration = Duration::from_millis(30_000);

/// Whether the user is present: tab visible and input within `threshold`.
///
/// The boundary is exclusive, so activity exactly `threshold` ago is stale.
#[inline]
#[must_use]
pub fn is_live_and_visible(state: &ActivityState, now: Instant, threshold: Duration) -> bool {
    if !state.is_tab_visible {
        return false;
    }
    state.idle_for(now) < threshold
}

/// Read-only view of liveness consumed by the persistence driver.
pub trait LivenessProbe: Send + Sync {
    /// See [`is_live_and_visible`]
    fn is_live_and_visible(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_is_never_live() {
        let now = Instant::now();
        let state = ActivityState::new(now, false);
        assert!(!is_live_and_visible(&state, now, STALENESS_THRESHOLD));
    }

    #[test]
    fn threshold_is_exclusive() {
        let start = Instant::now();
        let state = ActivityState::new(start, true);

        let just_before = start + STALENESS_THRESHOLD - Duration::from_millis(1);
        assert!(is_live_and_visible(&state, just_before, STALENESS_THRESHOLD));
        assert!(!is_live_and_visible(
            &state,
            start + STALENESS_THRESHOLD,
            STALENESS_THRESHOLD
        ));
    }

    #[test]
    fn clock_behind_stamp_counts_as_fresh() {
        let start = Instant::now();
        let state = ActivityState::new(start + Duration::from_secs(1), true);
        assert!(is_live_and_visible(&state, start, STALENESS_THRESHOLD));
    }
}
