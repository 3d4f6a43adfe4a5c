//! Error types for board autosave
//!
//! - Save failures reported by the persistence backend
//! - Configuration loading and validation failures
//! - Lifecycle misuse of a stopped session

use std::path::PathBuf;

/// Failure reported by a [`BoardSaver`](crate::BoardSaver)
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// Backend refused the write
    #[error("save rejected: {0}")]
    Rejected(String),

    /// Backend could not be reached
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Save future panicked
    #[error("save panicked: {0}")]
    Panicked(String),

    /// Anything else
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main autosave error type
#[derive(Debug, thiserror::Error)]
pub enum AutosaveError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Save failed
    #[error("save failed: {0}")]
    Save(#[from] SaveError),

    /// Session or driver already torn down
    #[error("autosave stopped")]
    Stopped,
}
