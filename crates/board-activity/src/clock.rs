//! Time source for activity bookkeeping.

use tokio::time::Instant;

/// Monotonic clock
///
/// Everything that stamps or compares activity times reads the clock through
/// this trait so tests can substitute a manual one.
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Clock backed by the tokio time driver.
///
/// Follows `tokio::time::pause` and `advance`, which keeps activity stamps
/// consistent with timers armed on the same runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_follows_paused_time() {
        let clock = TokioClock;
        let before = clock.now();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(clock.now() - before, Duration::from_secs(5));
    }
}
