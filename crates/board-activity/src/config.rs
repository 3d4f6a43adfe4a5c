//! Activity monitor configuration

use crate::liveness::STALENESS_THRESHOLD;
use crate::throttle::POINTER_THROTTLE_WINDOW;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning for the activity monitor and its input observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Activity older than this no longer counts as recent
    pub staleness_threshold: Duration,
    /// Pointer movement is coalesced into one record per window
    pub pointer_throttle: Duration,
}

impl MonitorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With staleness threshold
    #[inline]
    #[must_use]
    pub fn with_staleness_threshold(mut self, threshold: Duration) -> Self {
        self.staleness_threshold = threshold;
        self
    }

    /// With pointer throttle window
    #[inline]
    #[must_use]
    pub fn with_pointer_throttle(mut self, window: Duration) -> Self {
        self.pointer_throttle = window;
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            staleness_threshold: STALENESS_THRESHOLD,
            pointer_throttle: POINTER_THROTTLE_WINDOW,
        }
    }
}
