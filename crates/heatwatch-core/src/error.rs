//! Core error types for heatwatch-core.
//!
//! The operation-facing taxonomy in [`EngineError`] is surfaced to callers
//! verbatim -- every variant is local and recoverable, there is no internal
//! retry. Configuration and persistence failures have their own enums and
//! fold into [`EngineError`] via `#[from]`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the inbound engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Actor lacks the capability for this action or target.
    #[error("not authorized for this action")]
    Unauthorized,

    /// Zone identifier absent from the policy table (or not assignable).
    #[error("unknown or unassignable zone '{0}'")]
    InvalidZone(String),

    /// Referenced username has no cycle state.
    #[error("no such user '{0}'")]
    NotFound(String),

    /// Operation does not apply to the user's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Rejected because an organization-wide cutoff is active.
    #[error("system cutoff is active")]
    CutoffBlocked,

    /// Rejected because the post-cutoff mandatory rest window still holds.
    #[error("mandatory rest window is in effect")]
    MandatoryRestBlocked,

    /// Undo stack for the user is empty.
    #[error("nothing to undo")]
    NoUndoAvailable,

    /// Configuration errors (startup only).
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Write-through state store errors.
    #[error("state store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Failed to access data directory
    #[error("failed to access data directory: {0}")]
    DataDir(String),
}

/// Errors from the write-through snapshot store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read/write state file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode/decode state: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for EngineError
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
