//! Store error types

use std::io;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Data-access errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is unreachable. Fatal: no operation may proceed.
    #[error("Data store unreachable: {0}")]
    Connection(String),

    /// A collection file failed to parse. Corruption is never ignored.
    #[error("Corrupt collection '{collection}': {reason}")]
    Corrupt { collection: String, reason: String },

    /// Record does not exist
    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Record id already taken
    #[error("Record already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },

    /// Underlying I/O failure
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// JSON serialization failure
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// Corrupt-collection error
    pub fn corrupt(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            collection: collection.into(),
            reason: reason.into(),
        }
    }

    /// Not-found error
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Already-exists error
    pub fn already_exists(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// I/O error tagged with the path it occurred at
    pub fn io_at(path: &std::path::Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// True for errors that mean the store cannot be used at all
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
