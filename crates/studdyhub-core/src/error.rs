//! Core error types for studdyhub-core.
//!
//! Errors are grouped by the collaborator that produced them so callers can
//! tell a failed session write apart from a bad config value.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studdyhub-core.
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

    /// Session recorder errors
    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),

    /// Notifier errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// The cycle controller task is gone
    #[error("Focus controller has shut down")]
    ControllerClosed,

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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Could not resolve the data directory
    #[error("Cannot determine data directory: {0}")]
    DataDir(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors from a [`SessionRecorder`](crate::recorder::SessionRecorder).
#[derive(Error, Debug)]
pub enum RecorderError {
    /// Local store failed
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Remote store answered with a non-success status
    #[error("Backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Request never completed (DNS, TLS, connection reset, ...)
    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response could not be interpreted
    #[error("Unexpected backend response: {0}")]
    InvalidResponse(String),

    /// Blocking worker panicked or was cancelled
    #[error("Recorder worker failed: {0}")]
    Worker(String),
}

/// Errors from a [`Notifier`](crate::notify::Notifier).
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Writing to the local sink failed
    #[error("Notification output failed: {0}")]
    Io(#[from] std::io::Error),

    /// Webhook answered with a non-success status
    #[error("Webhook returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Webhook request never completed
    #[error("Webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Notifier has no destination configured
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<rusqlite::Error> for RecorderError {
    fn from(err: rusqlite::Error) -> Self {
        RecorderError::Database(err.into())
    }
}

impl From<tokio::task::JoinError> for RecorderError {
    fn from(err: tokio::task::JoinError) -> Self {
        RecorderError::Worker(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
