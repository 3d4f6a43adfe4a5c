//! Host input events and the observer registry
//!
//! The editor host (a webview bridge, a native window, a test) pushes raw
//! input through an [`EventSource`]. The activity tracker only ever sees the
//! subscribe/unsubscribe surface, so the monitor stays independent of how
//! events are delivered.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Mouse button of a click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    /// Usually the left button
    Primary,
    /// Wheel button
    Middle,
    /// Usually the right button
    Secondary,
}

/// Input delivered by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// Pointer moved over the board
    PointerMove {
        /// Horizontal position in CSS pixels
        x: f64,
        /// Vertical position in CSS pixels
        y: f64,
    },
    /// Key pressed
    KeyDown {
        /// Key name as reported by the host
        key: String,
    },
    /// Mouse click
    Click {
        /// Button that was clicked
        button: MouseButton,
    },
    /// Tab moved to or from the background
    VisibilityChange {
        /// Whether the tab is now hidden
        hidden: bool,
    },
}

impl HostEvent {
    /// Kind used to route this event to listeners
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PointerMove { .. } => EventKind::PointerMove,
            Self::KeyDown { .. } => EventKind::KeyDown,
            Self::Click { .. } => EventKind::Click,
            Self::VisibilityChange { .. } => EventKind::VisibilityChange,
        }
    }
}

/// Event routing key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// [`HostEvent::PointerMove`]
    PointerMove,
    /// [`HostEvent::KeyDown`]
    KeyDown,
    /// [`HostEvent::Click`]
    Click,
    /// [`HostEvent::VisibilityChange`]
    VisibilityChange,
}

/// Registration options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Passive listeners never block or cancel the host's default handling
    pub passive: bool,
}

impl ListenerOptions {
    /// Passive, non-blocking registration
    pub const PASSIVE: Self = Self { passive: true };
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self::PASSIVE
    }
}

/// Event callback
pub type Listener = Arc<dyn Fn(&HostEvent) + Send + Sync>;

/// Registration handle returned by [`EventSource::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Platform input and visibility signals
pub trait EventSource: Send + Sync {
    /// Whether the tab is currently hidden
    fn is_hidden(&self) -> bool;

    /// Register `listener` for events of `kind`
    fn subscribe(&self, kind: EventKind, options: ListenerOptions, listener: Listener)
        -> ListenerId;

    /// Remove a registration. Returns false if it was already gone.
    fn unsubscribe(&self, id: ListenerId) -> bool;
}

struct Registration {
    kind: EventKind,
    options: ListenerOptions,
    listener: Listener,
}

/// In-process event source
///
/// Hosts forward their platform events with [`dispatch`](Self::dispatch);
/// tests use the same entry point to inject synthetic input.
pub struct LocalEventBus {
    hidden: AtomicBool,
    next_id: AtomicU64,
    listeners: DashMap<ListenerId, Registration>,
}

impl LocalEventBus {
    /// Create a bus with the given initial visibility
    #[must_use]
    pub fn new(hidden: bool) -> Self {
        Self {
            hidden: AtomicBool::new(hidden),
            next_id: AtomicU64::new(1),
            listeners: DashMap::new(),
        }
    }

    /// Deliver an event to every listener registered for its kind.
    ///
    /// Visibility events update [`is_hidden`](EventSource::is_hidden) before
    /// listeners run. Returns the number of listeners invoked.
    pub fn dispatch(&self, event: &HostEvent) -> usize {
        if let HostEvent::VisibilityChange { hidden } = event {
            self.hidden.store(*hidden, Ordering::SeqCst);
        }

        let kind = event.kind();
        // Listeners run outside the map guard so they may unsubscribe.
        let matching: Vec<Listener> = self
            .listeners
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| Arc::clone(&entry.listener))
            .collect();

        trace!(?kind, listeners = matching.len(), "dispatching host event");
        for listener in &matching {
            listener(event);
        }
        matching.len()
    }

    /// Change visibility, notifying listeners only on an actual change
    pub fn set_hidden(&self, hidden: bool) {
        if self.hidden.load(Ordering::SeqCst) != hidden {
            self.dispatch(&HostEvent::VisibilityChange { hidden });
        }
    }

    /// Number of live registrations
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of live registrations that are passive
    #[must_use]
    pub fn passive_count(&self) -> usize {
        self.listeners.iter().filter(|e| e.options.passive).count()
    }
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::new(false)
    }
}

impl EventSource for LocalEventBus {
    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    fn subscribe(
        &self,
        kind: EventKind,
        options: ListenerOptions,
        listener: Listener,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(
            id,
            Registration {
                kind,
                options,
                listener,
            },
        );
        id
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }
}

impl std::fmt::Debug for LocalEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEventBus")
            .field("hidden", &self.is_hidden())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_listener(counter: &Arc<AtomicUsize>) -> Listener {
        let counter = Arc::clone(counter);
        Arc::new(move |_: &HostEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn routes_by_kind() {
        let bus = LocalEventBus::new(false);
        let keys = Arc::new(AtomicUsize::new(0));
        let clicks = Arc::new(AtomicUsize::new(0));
        bus.subscribe(EventKind::KeyDown, ListenerOptions::PASSIVE, counting_listener(&keys));
        bus.subscribe(EventKind::Click, ListenerOptions::PASSIVE, counting_listener(&clicks));

        bus.dispatch(&HostEvent::KeyDown { key: "a".into() });
        bus.dispatch(&HostEvent::KeyDown { key: "b".into() });
        bus.dispatch(&HostEvent::Click {
            button: MouseButton::Primary,
        });

        assert_eq!(keys.load(Ordering::SeqCst), 2);
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = LocalEventBus::new(false);
        let keys = Arc::new(AtomicUsize::new(0));
        let id = bus.subscribe(
            EventKind::KeyDown,
            ListenerOptions::PASSIVE,
            counting_listener(&keys),
        );

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.dispatch(&HostEvent::KeyDown { key: "a".into() }), 0);
        assert_eq!(keys.load(Ordering::SeqCst), 0);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn visibility_dispatch_updates_flag_first() {
        let bus = Arc::new(LocalEventBus::new(false));
        let seen_hidden = Arc::new(AtomicBool::new(false));
        let probe = Arc::clone(&bus);
        let seen = Arc::clone(&seen_hidden);
        bus.subscribe(
            EventKind::VisibilityChange,
            ListenerOptions::PASSIVE,
            Arc::new(move |_: &HostEvent| seen.store(probe.is_hidden(), Ordering::SeqCst)),
        );

        bus.set_hidden(true);

        assert!(bus.is_hidden());
        assert!(seen_hidden.load(Ordering::SeqCst));
    }

    #[test]
    fn set_hidden_without_change_is_silent() {
        let bus = LocalEventBus::new(true);
        let changes = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            EventKind::VisibilityChange,
            ListenerOptions::PASSIVE,
            counting_listener(&changes),
        );

        bus.set_hidden(true);
        assert_eq!(changes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn host_event_json_shape() {
        let event: HostEvent =
            serde_json::from_str(r#"{"type":"click","button":"primary"}"#).unwrap();
        assert_eq!(
            event,
            HostEvent::Click {
                button: MouseButton::Primary
            }
        );
    }
}
