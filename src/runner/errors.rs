//! Runner error types
//!
//! Only conditions that abort an operation are errors here. An empty
//! match, an operator declining the gate, and per-record action
//! failures are all reported through the Execution Report instead.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for runner operations
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Fatal runner failures
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The data store is unreachable. Aborts before any mutation.
    #[error("Data store unreachable: {0}")]
    Connection(String),

    /// The target query could not be resolved (corrupt collection,
    /// I/O failure). Aborts before any mutation.
    #[error("Failed to resolve target records: {0}")]
    Query(StoreError),

    /// The rollback log could not be written or read
    #[error("Rollback log error at {path}: {reason}")]
    RollbackLog { path: String, reason: String },

    /// No rollback-log entry for the given operation id
    #[error("No recorded operation with id '{0}'")]
    UnknownOperation(String),
}

impl RunnerError {
    /// Rollback-log error tagged with the path it occurred at
    pub fn rollback_log(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::RollbackLog {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for RunnerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Connection(msg) => Self::Connection(msg),
            other => Self::Query(other),
        }
    }
}
