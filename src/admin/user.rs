//! # User model
//!
//! User documents live in the `users` collection. The operator tooling
//! round-trips them losslessly (hash included) but redacts the password
//! hash from every piece of CLI output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::store::StoredRecord;

use super::errors::{AdminError, AdminResult};
use super::password::{hash_password, verify_password, PasswordPolicy};
use super::roles::{validate_role, Collections, ROLE_SUPER_ADMIN};

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,

    /// Phone number (unique, the primary operator-facing identity)
    pub phone: String,

    /// Email address (unique when present)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// First name
    #[serde(default)]
    pub first_name: String,

    /// Last name
    #[serde(default)]
    pub last_name: String,

    /// Role name (one of the known roles)
    pub role: String,

    /// Whether the account may log in
    pub is_active: bool,

    /// When the user last logged in; absent for accounts that never
    /// have
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,

    /// Argon2id password hash (never plaintext)
    pub password_hash: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new super admin account with a policy-checked password
    pub fn new_super_admin(
        phone: impl Into<String>,
        email: Option<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        password: &str,
        policy: &PasswordPolicy,
    ) -> AdminResult<Self> {
        policy.validate(password)?;
        let password_hash = hash_password(password)?;

        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            phone: phone.into(),
            email,
            first_name: first_name.into(),
            last_name: last_name.into(),
            role: ROLE_SUPER_ADMIN.to_string(),
            is_active: true,
            last_login: None,
            password_hash,
            created_at: now,
            updated_at: now,
        })
    }

    /// Full display name
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// True for super admin accounts
    pub fn is_super_admin(&self) -> bool {
        self.role == ROLE_SUPER_ADMIN
    }

    /// Verify a password against this user's stored hash
    pub fn verify_password(&self, password: &str) -> AdminResult<bool> {
        verify_password(password, &self.password_hash)
    }

    /// Replace the password with a policy-checked new one
    pub fn set_password(&mut self, new_password: &str, policy: &PasswordPolicy) -> AdminResult<()> {
        policy.validate(new_password)?;
        self.password_hash = hash_password(new_password)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Converts to a store record (lossless; hash included)
    pub fn to_record(&self) -> AdminResult<StoredRecord> {
        validate_role(&self.role)?;
        let body = serde_json::to_value(self)
            .map_err(|e| AdminError::MalformedUser {
                id: self.id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(StoredRecord::new(Collections::USERS, self.id.to_string(), body))
    }

    /// Parses a store record into a user
    pub fn from_record(record: &StoredRecord) -> AdminResult<Self> {
        serde_json::from_value(record.body.clone()).map_err(|e| AdminError::MalformedUser {
            id: record.id.clone(),
            reason: e.to_string(),
        })
    }

    /// Redacted representation for CLI output. The password hash MUST
    /// never appear here.
    pub fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "phone": self.phone,
            "email": self.email,
            "name": self.full_name(),
            "role": self.role,
            "is_active": self.is_active,
            "created_at": self.created_at,
        })
    }
}
