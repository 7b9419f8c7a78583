//! Error types for session-core operations.

use std::path::PathBuf;

use session_contract::ContractError;

/// All errors that can surface from session-core.
///
/// Most manager operations are infallible by contract (corrupt state is
/// recovered locally, cleanup failures are logged). `login`, the file-backed
/// adapters and configuration loading are the places these escape.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    // ─────────────────────────────────────────────────────────────────────
    // Identity / Contract
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid identity: {0}")]
    InvalidIdentity(#[source] ContractError),

    #[error("Session record rejected: {0}")]
    Record(#[source] ContractError),

    // ─────────────────────────────────────────────────────────────────────
    // Storage
    // ─────────────────────────────────────────────────────────────────────
    #[error("Storage error: {context}: {details}")]
    Storage { context: String, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Home directory not found")]
    HomeDirNotFound,
}

impl SessionError {
    pub(crate) fn storage(context: impl Into<String>, details: impl ToString) -> Self {
        SessionError::Storage {
            context: context.into(),
            details: details.to_string(),
        }
    }
}

/// Convenience type alias for Results using SessionError.
pub type Result<T> = std::result::Result<T, SessionError>;
