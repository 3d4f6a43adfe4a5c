//! Autosave session
//!
//! One session per open board: attaches the activity tracker to the host's
//! event source, starts the persistence driver against the tracker's
//! monitor, and tears both down together.

use crate::config::AutosaveConfig;
use crate::driver::{DriverState, DriverStats, PersistenceDriver};
use crate::error::AutosaveError;
use crate::saver::BoardSaver;
use crate::timer::{Timer, TokioTimer};
use board_activity::{ActivityState, ActivityTracker, Clock, EventSource, LivenessProbe, TokioClock};
use std::sync::Arc;
use tracing::{info, info_span};
use uuid::Uuid;

/// Running autosave for one board
#[derive(Debug)]
pub struct AutosaveSession {
    id: Uuid,
    config: AutosaveConfig,
    tracker: ActivityTracker,
    driver: PersistenceDriver,
}

impl AutosaveSession {
    /// Start with the tokio clock and timer
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// - `AutosaveError::Config` if `config` is invalid
    pub fn start(
        config: AutosaveConfig,
        events: Arc<dyn EventSource>,
        saver: Arc<dyn BoardSaver>,
    ) -> Result<Self, AutosaveError> {
        Self::start_with(config, events, saver, Arc::new(TokioClock), Arc::new(TokioTimer))
    }

    /// Start with explicit platform collaborators
    ///
    /// # Errors
    /// - `AutosaveError::Config` if `config` is invalid
    pub fn start_with(
        config: AutosaveConfig,
        events: Arc<dyn EventSource>,
        saver: Arc<dyn BoardSaver>,
        clock: Arc<dyn Clock>,
        timer: Arc<dyn Timer>,
    ) -> Result<Self, AutosaveError> {
        config.validate()?;

        let id = Uuid::new_v4();
        let span = info_span!("autosave", session = %id);
        let _entered = span.enter();

        let tracker = ActivityTracker::attach(events, clock, config.monitor_config());
        let probe: Arc<dyn LivenessProbe> = tracker.monitor().clone();
        let driver =
            PersistenceDriver::start_with_timer(config.save_interval(), probe, saver, timer);

        info!(
            save_interval_ms = config.save_interval_ms,
            staleness_threshold_ms = config.staleness_threshold_ms,
            "autosave session started"
        );

        Ok(Self {
            id,
            config,
            tracker,
            driver,
        })
    }

    /// Session id attached to log lines
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Effective configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AutosaveConfig {
        &self.config
    }

    /// Whether the user is present right now
    #[must_use]
    pub fn is_live_and_visible(&self) -> bool {
        self.tracker.monitor().is_live_and_visible()
    }

    /// Copy of the activity state
    #[must_use]
    pub fn activity(&self) -> ActivityState {
        self.tracker.monitor().snapshot()
    }

    /// Driver lifecycle state
    #[must_use]
    pub fn driver_state(&self) -> DriverState {
        self.driver.state()
    }

    /// Driver counters
    #[must_use]
    pub fn stats(&self) -> DriverStats {
        self.driver.stats()
    }

    /// Save immediately regardless of liveness
    ///
    /// # Errors
    /// - see [`PersistenceDriver::save_now`]
    pub async fn save_now(&self) -> Result<(), AutosaveError> {
        self.driver.save_now().await
    }

    /// Stop the driver and remove every input observer.
    /// Calling it again is a no-op.
    pub fn stop(&self) {
        if self.driver.is_stopped() {
            return;
        }
        self.driver.stop();
        self.tracker.detach();
        info!(session = %self.id, "autosave session stopped");
    }
}

impl Drop for AutosaveSession {
    fn drop(&mut self) {
        self.stop();
    }
}
