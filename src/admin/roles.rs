//! # Role catalog and collection names
//!
//! Role names and grant collections as the application defines them.
//! Grant rows reference users, roles, and permissions by id; the
//! integrity checks verify those references.

use super::errors::{AdminError, AdminResult};

/// Super admin role name
pub const ROLE_SUPER_ADMIN: &str = "SUPER_ADMIN";
/// Staff role name
pub const ROLE_STAFF: &str = "STAFF";
/// Customer role name
pub const ROLE_CUSTOMER: &str = "CUSTOMER";

/// All role names the application knows
pub fn known_roles() -> [&'static str; 3] {
    [ROLE_SUPER_ADMIN, ROLE_STAFF, ROLE_CUSTOMER]
}

/// Checks a role name against the catalog
pub fn validate_role(role: &str) -> AdminResult<()> {
    if known_roles().contains(&role) {
        Ok(())
    } else {
        Err(AdminError::UnknownRole(role.to_string()))
    }
}

/// Collection names used by the application schema
pub struct Collections;

impl Collections {
    /// User accounts
    pub const USERS: &'static str = "users";
    /// Role definitions
    pub const ROLES: &'static str = "roles";
    /// Permission definitions
    pub const PERMISSIONS: &'static str = "permissions";
    /// Role → permission grants
    pub const ROLE_PERMISSIONS: &'static str = "role_permissions";
    /// User → role grants
    pub const USER_ROLES: &'static str = "user_roles";
    /// One-time passwords issued during login
    pub const OTPS: &'static str = "otps";
}
