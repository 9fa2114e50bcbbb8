//! Core error types for windward-core.
//!
//! The taxonomy follows the degradation rules of the engine: store and
//! config failures degrade to defaults at the call site, malformed input
//! is logged and dropped, and only illegal state transitions
//! ([`ValidationError`]) are meant to surface to the user-facing layer.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for windward-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Shared store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Illegal state transitions, rejected at the call site
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Shared-store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the shared store
    #[error("Failed to open shared store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Store is locked by the other process
    #[error("Shared store is locked")]
    Locked,
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Illegal state transitions.
///
/// The one error category that surfaces to the user-facing layer as a
/// recoverable error instead of degrading silently.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A break session is already running
    #[error("A {kind} break is already active; unlock it before starting another")]
    BreakAlreadyActive { kind: String },

    /// No break session is running
    #[error("No break session is active")]
    NoActiveBreak,

    /// Safety breaks are only reachable from an active safety shield
    #[error("Safety break requires the safety shield to be active")]
    SafetyShieldNotActive,

    /// Committed breaks need a duration or an end-of-day marker
    #[error("Committed break requires --minutes or --until-end-of-day")]
    MissingBreakDuration,

    /// The companion has blown away; its history is immutable
    #[error("Companion has blown away; history is immutable")]
    CompanionBlown,

    /// At most one progression per calendar day
    #[error("Companion already progressed today")]
    AlreadyProgressedToday,

    /// Progression requires an essence
    #[error("Companion has no essence yet")]
    MissingEssence,

    /// No more phases to progress into
    #[error("Companion is already at its final phase")]
    AtFinalPhase,

    /// No companion history exists
    #[error("No companion has been adopted yet")]
    NoCompanion,

    /// A living companion already exists
    #[error("A companion is already alive; it must blow away before adopting another")]
    CompanionAlive,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
