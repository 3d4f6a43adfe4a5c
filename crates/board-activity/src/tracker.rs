//! Activity tracker
//!
//! Wires an [`EventSource`] to an [`ActivityMonitor`]:
//! - pointer movement, throttled, records activity
//! - key presses record activity
//! - primary clicks record activity
//! - visibility changes update the tab flag
//!
//! All registrations are passive. [`ActivityTracker::detach`] removes every
//! one of them and drops any pending throttle flush.

use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::events::{EventKind, EventSource, HostEvent, ListenerId, ListenerOptions, MouseButton};
use crate::monitor::ActivityMonitor;
use crate::throttle::Throttle;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Owns the input subscriptions feeding one monitor
pub struct ActivityTracker {
    monitor: Arc<ActivityMonitor>,
    source: Arc<dyn EventSource>,
    pointer: Arc<Throttle>,
    subscriptions: Mutex<Vec<ListenerId>>,
}

impl ActivityTracker {
    /// Create a monitor from the source's current visibility and subscribe
    /// to its input events.
    pub fn attach(
        source: Arc<dyn EventSource>,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
    ) -> Self {
        let monitor = Arc::new(ActivityMonitor::new(
            clock,
            !source.is_hidden(),
            config.staleness_threshold,
        ));

        let pointer = {
            let monitor = Arc::clone(&monitor);
            Arc::new(Throttle::new(config.pointer_throttle, move || {
                monitor.record_activity();
            }))
        };

        let mut subscriptions = Vec::with_capacity(4);

        let throttle = Arc::clone(&pointer);
        subscriptions.push(source.subscribe(
            EventKind::PointerMove,
            ListenerOptions::PASSIVE,
            Arc::new(move |_: &HostEvent| throttle.call()),
        ));

        let target = Arc::clone(&monitor);
        subscriptions.push(source.subscribe(
            EventKind::KeyDown,
            ListenerOptions::PASSIVE,
            Arc::new(move |_: &HostEvent| target.record_activity()),
        ));

        let target = Arc::clone(&monitor);
        subscriptions.push(source.subscribe(
            EventKind::Click,
            ListenerOptions::PASSIVE,
            Arc::new(move |event: &HostEvent| {
                if matches!(
                    event,
                    HostEvent::Click {
                        button: MouseButton::Primary
                    }
                ) {
                    target.record_activity();
                }
            }),
        ));

        let target = Arc::clone(&monitor);
        subscriptions.push(source.subscribe(
            EventKind::VisibilityChange,
            ListenerOptions::PASSIVE,
            Arc::new(move |event: &HostEvent| {
                if let HostEvent::VisibilityChange { hidden } = event {
                    target.set_visible(!hidden);
                }
            }),
        ));

        debug!(
            visible = !source.is_hidden(),
            listeners = subscriptions.len(),
            "activity tracker attached"
        );

        Self {
            monitor,
            source,
            pointer,
            subscriptions: Mutex::new(subscriptions),
        }
    }

    /// Monitor fed by this tracker
    #[inline]
    #[must_use]
    pub fn monitor(&self) -> &Arc<ActivityMonitor> {
        &self.monitor
    }

    /// Whether the tracker still holds subscriptions
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.subscriptions.lock().is_empty()
    }

    /// Remove every subscription and cancel the pointer throttle.
    /// Calling it again is a no-op.
    pub fn detach(&self) {
        let ids = std::mem::take(&mut *self.subscriptions.lock());
        if ids.is_empty() {
            return;
        }
        for id in &ids {
            self.source.unsubscribe(*id);
        }
        self.pointer.cancel();
        debug!(removed = ids.len(), "activity tracker detached");
    }
}

impl Drop for ActivityTracker {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for ActivityTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityTracker")
            .field("monitor", &self.monitor)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}
