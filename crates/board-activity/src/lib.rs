//! Board Activity - user liveness tracking
//!
//! Tracks whether the person editing a board is present:
//! - Input observers (pointer movement, key presses, primary clicks)
//! - Tab visibility changes
//! - A pure liveness predicate over the recorded state
//!
//! # Example
//!
//! ```rust,ignore
//! use board_activity::{ActivityTracker, HostEvent, LocalEventBus, MonitorConfig, TokioClock};
//! use std::sync::Arc;
//!
//! let bus = Arc::new(LocalEventBus::new(false));
//! let tracker =
//!     ActivityTracker::attach(bus.clone(), Arc::new(TokioClock), MonitorConfig::default());
//!
//! bus.dispatch(&HostEvent::KeyDown { key: "a".into() });
//! assert!(tracker.monitor().is_live_and_visible());
//! ```

#![warn(unreachable_pub)]

pub mod clock;
pub mod config;
pub mod events;
pub mod liveness;
pub mod monitor;
pub mod state;
pub mod throttle;
pub mod tracker;

pub use clock::{Clock, TokioClock};
pub use config::MonitorConfig;
pub use events::{
    EventKind, EventSource, HostEvent, Listener, ListenerId, ListenerOptions, LocalEventBus,
    MouseButton,
};
pub use liveness::{is_live_and_visible, LivenessProbe, STALENESS_THRESHOLD};
pub use monitor::ActivityMonitor;
pub use state::ActivityState;
pub use throttle::{Throttle, ThrottleGate, POINTER_THROTTLE_WINDOW};
pub use tracker::ActivityTracker;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
