//! Board Autosave - activity-gated periodic persistence
//!
//! Saves an open board on a fixed cadence while the user is present:
//! - Skips saves when the tab is hidden or input has gone stale
//! - Swallows and logs save failures without disturbing the cadence
//! - Tears down cleanly, including saves still in flight
//!
//! # Example
//!
//! ```rust,ignore
//! use board_autosave::{AutosaveConfig, AutosaveSession, SaveFn};
//! use board_activity::LocalEventBus;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let events = Arc::new(LocalEventBus::new(false));
//! let saver = Arc::new(SaveFn::new(|| async { Ok(()) }));
//! let session = AutosaveSession::start(AutosaveConfig::new(), events, saver)?;
//!
//! // ... host forwards input into `events` ...
//!
//! session.stop();
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod saver;
pub mod session;
pub mod timer;

pub use config::{AutosaveConfig, DEFAULT_SAVE_INTERVAL};
pub use driver::{DriverState, DriverStats, PersistenceDriver, TickOutcome};
pub use error::{AutosaveError, ConfigError, SaveError};
pub use logging::{init_tracing, LogFormat};
pub use saver::{BoardSaver, SaveFn};
pub use session::AutosaveSession;
pub use timer::{Timer, TimerHandle, TokioTimer};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for hosting an autosave session
    pub use crate::{AutosaveConfig, AutosaveError, AutosaveSession, BoardSaver, SaveError, SaveFn};
    pub use board_activity::{EventSource, HostEvent, LocalEventBus, MouseButton};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
