//! Core error types for questforge-core.
//!
//! Two families live here. [`CoreError`] and its children describe failures of
//! the surrounding machinery (database, config files, serialization).
//! [`Refusal`] describes an operation the engine declined to perform because
//! the game state does not allow it; a refusal never mutates anything.

use std::path::PathBuf;
use thiserror::Error;

use crate::effects::EffectId;
use crate::goal::GoalLevel;

/// Core error type for questforge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// The store refused the write (disk full, quota)
    #[error("Storage quota exceeded")]
    QuotaExceeded,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Empty required text
    #[error("Empty value for '{0}'")]
    Empty(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// An operation the engine declined.
///
/// Refusals are expected outcomes of user actions, not faults: the state is
/// untouched and the message is meant to be shown as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Refusal {
    #[error("No {level} goal with id '{id}'")]
    GoalNotFound { level: GoalLevel, id: String },

    #[error("Checklist item '{item_id}' not found")]
    ChecklistItemNotFound { item_id: String },

    #[error("Finish the checklist first ({remaining} item(s) open)")]
    ChecklistIncomplete { remaining: usize },

    #[error("Progress is {progress}%; this goal completes when all of its children do")]
    ProgressIncomplete { progress: u8 },

    #[error("{level} goals cannot have parents")]
    NotLinkable { level: GoalLevel },

    #[error("Goal '{child_id}' is not linked to '{parent_id}'")]
    NotLinked { child_id: String, parent_id: String },

    #[error("{level} goals cannot be bosses")]
    NotBossEligible { level: GoalLevel },

    #[error("Boss '{id}' is already {state}")]
    BossState { id: String, state: &'static str },

    #[error("Goal '{id}' has no linked children to fight through")]
    NoChildren { id: String },

    #[error("No charges left for {0}")]
    NoCharges(EffectId),

    #[error("{effect} unlocks at level {required}")]
    LevelGated { effect: EffectId, required: u32 },

    #[error("{0} is already active")]
    AlreadyActive(EffectId),

    #[error("{effect} has no valid target: {reason}")]
    NoTarget { effect: EffectId, reason: String },

    #[error("Another cast is still resolving")]
    CastInProgress,

    #[error("Not enough gold: need {needed}, have {available}")]
    InsufficientGold { needed: u64, available: u64 },

    #[error("No companion with id '{0}'")]
    CompanionNotFound(String),

    #[error("Focus session is {0}")]
    FocusState(&'static str),

    #[error("{0}")]
    Invalid(#[from] ValidationError),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => match e.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    DatabaseError::Locked
                }
                rusqlite::ErrorCode::DiskFull => DatabaseError::QuotaExceeded,
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
