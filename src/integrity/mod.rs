//! Database integrity auditing
//!
//! Read-only checks over the application collections. Findings are
//! reported, never repaired here; repairs go through the
//! destructive-operation runner so they are confirmed, snapshotted,
//! and reversible.

mod checks;

pub use checks::{audit_all, verify_permissions};

use serde::Serialize;

/// Stable finding codes operators can grep for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingCode {
    /// Document failed to parse as its expected shape
    MalformedRecord,
    /// Two users share a phone number
    DuplicatePhone,
    /// Two users share an email
    DuplicateEmail,
    /// Phone number is not a plausible phone
    InvalidPhone,
    /// Email does not look like an email
    InvalidEmail,
    /// User role is not in the role catalog
    UnknownRole,
    /// A super admin account is deactivated
    InactiveSuperAdmin,
    /// No active super admin exists at all
    NoSuperAdmin,
    /// user_roles row references a missing user
    OrphanedUserRole,
    /// role_permissions row references a missing permission
    OrphanedRolePermission,
    /// Grant row references a missing role
    DanglingRole,
    /// The same grant appears twice
    DuplicateGrant,
}

/// One integrity problem
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Finding code
    pub code: FindingCode,
    /// Collection the problem lives in
    pub collection: String,
    /// Offending record, when the problem is record-specific
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    /// Human-readable description
    pub message: String,
}

impl Finding {
    /// Record-specific finding
    pub fn record(
        code: FindingCode,
        collection: impl Into<String>,
        record_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            collection: collection.into(),
            record_id: Some(record_id.into()),
            message: message.into(),
        }
    }

    /// Collection-wide finding
    pub fn collection(
        code: FindingCode,
        collection: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            collection: collection.into(),
            record_id: None,
            message: message.into(),
        }
    }
}

/// Result of an audit pass
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    /// Records examined across all checked collections
    pub records_checked: usize,
    /// Problems found, in check order
    pub findings: Vec<Finding>,
}

impl IntegrityReport {
    /// True when nothing was found
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}
