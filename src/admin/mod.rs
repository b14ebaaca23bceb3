//! # Admin domain
//!
//! The application's account model as the operator tooling sees it:
//! phone-keyed user documents with a role and an active flag, the
//! role/permission grant collections, and password handling.

mod errors;
mod password;
mod roles;
mod user;

pub use errors::{AdminError, AdminResult};
pub use password::{generate_password, hash_password, verify_password, PasswordPolicy};
pub use roles::{known_roles, Collections, ROLE_CUSTOMER, ROLE_STAFF, ROLE_SUPER_ADMIN};
pub use user::User;
