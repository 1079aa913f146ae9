//! Error types shared by the store, the engine and the notifiers

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the durable key/value store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend refused the operation (device gone, read-only, simulated outage)
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode stored state: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors surfaced by timer commands
#[derive(Debug, Error)]
pub enum EngineError {
    /// Non-positive duration or round count, rejected before any write
    #[error("invalid config value for '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The command had no effect because the store could not be written
    #[error(transparent)]
    StorageUnavailable(#[from] StoreError),
}

impl EngineError {
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Alert delivery failure; never rolled back into the state machine
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to launch alarm command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("notifier rejected event: {0}")]
    Rejected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type EngineResult<T> = Result<T, EngineError>;
