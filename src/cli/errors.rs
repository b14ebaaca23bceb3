//! CLI-specific error types
//!
//! Every error that reaches main is fatal; anything recoverable is
//! reported through a response object instead.

use std::fmt;
use std::io;

use crate::admin::AdminError;
use crate::runner::RunnerError;
use crate::store::StoreError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Already initialized
    AlreadyInitialized,
    /// Not initialized
    NotInitialized,
    /// Data store failure
    StoreError,
    /// Destructive operation or rollback failure
    OperationError,
    /// Invalid operator input (password policy, duplicate account, ...)
    ValidationError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "ADMIN_CLI_CONFIG_ERROR",
            Self::IoError => "ADMIN_CLI_IO_ERROR",
            Self::AlreadyInitialized => "ADMIN_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "ADMIN_CLI_NOT_INITIALIZED",
            Self::StoreError => "ADMIN_CLI_STORE_ERROR",
            Self::OperationError => "ADMIN_CLI_OPERATION_ERROR",
            Self::ValidationError => "ADMIN_CLI_VALIDATION_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Already initialized
    pub fn already_initialized() -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            "Data directory already initialized",
        )
    }

    /// Not initialized
    pub fn not_initialized() -> Self {
        Self::new(
            CliErrorCode::NotInitialized,
            "Data directory not initialized. Run 'adminctl init' first.",
        )
    }

    /// Invalid operator input
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ValidationError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::new(CliErrorCode::StoreError, e.to_string())
    }
}

impl From<RunnerError> for CliError {
    fn from(e: RunnerError) -> Self {
        Self::new(CliErrorCode::OperationError, e.to_string())
    }
}

impl From<AdminError> for CliError {
    fn from(e: AdminError) -> Self {
        Self::new(CliErrorCode::ValidationError, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
