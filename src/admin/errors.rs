//! # Admin domain errors

use thiserror::Error;

/// Result type for admin domain operations
pub type AdminResult<T> = Result<T, AdminError>;

/// Account and credential errors
#[derive(Debug, Clone, Error)]
pub enum AdminError {
    /// Phone number already registered
    #[error("User with phone {0} already exists")]
    PhoneAlreadyExists(String),

    /// Email already registered
    #[error("User with email {0} already exists")]
    EmailAlreadyExists(String),

    /// No user with the given phone
    #[error("User with phone {0} not found")]
    UserNotFound(String),

    /// Password does not meet requirements
    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    /// Password hashing failed
    #[error("Internal error: password hashing failed")]
    HashingFailed,

    /// Stored document does not look like a user
    #[error("Malformed user document {id}: {reason}")]
    MalformedUser { id: String, reason: String },

    /// Role name is not in the catalog
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}
