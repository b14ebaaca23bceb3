//! Integrity check implementations
//!
//! All checks read through the data-access layer and produce findings;
//! a connection failure or corrupt collection aborts the audit
//! explicitly.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::admin::{known_roles, Collections, User, ROLE_SUPER_ADMIN};
use crate::query::TargetQuery;
use crate::store::{DataStore, StoreResult, StoredRecord};

use super::{Finding, FindingCode, IntegrityReport};

/// Runs every integrity check
pub fn audit_all(store: &dyn DataStore) -> StoreResult<IntegrityReport> {
    store.ping()?;

    let users = store.query(&TargetQuery::all(Collections::USERS))?;
    let mut findings = Vec::new();
    let mut records_checked = users.len();

    check_users(&users, &mut findings);

    let grant_report = verify_permissions(store)?;
    records_checked += grant_report.records_checked;
    findings.extend(grant_report.findings);

    Ok(IntegrityReport {
        records_checked,
        findings,
    })
}

/// Runs the grant and role-assignment checks only
pub fn verify_permissions(store: &dyn DataStore) -> StoreResult<IntegrityReport> {
    store.ping()?;

    let users = store.query(&TargetQuery::all(Collections::USERS))?;
    let roles = store.query(&TargetQuery::all(Collections::ROLES))?;
    let permissions = store.query(&TargetQuery::all(Collections::PERMISSIONS))?;
    let user_roles = store.query(&TargetQuery::all(Collections::USER_ROLES))?;
    let role_permissions = store.query(&TargetQuery::all(Collections::ROLE_PERMISSIONS))?;

    let records_checked =
        roles.len() + permissions.len() + user_roles.len() + role_permissions.len();

    let user_ids: HashSet<&str> = users.iter().map(|r| r.id.as_str()).collect();
    let role_ids: HashSet<&str> = roles.iter().map(|r| r.id.as_str()).collect();
    let permission_ids: HashSet<&str> = permissions.iter().map(|r| r.id.as_str()).collect();

    let mut findings = Vec::new();

    check_user_roles(&user_roles, &user_ids, &role_ids, &mut findings);
    check_role_permissions(&role_permissions, &role_ids, &permission_ids, &mut findings);

    Ok(IntegrityReport {
        records_checked,
        findings,
    })
}

/// User-collection checks: shape, uniqueness, role validity, and the
/// super admin safety net
fn check_users(users: &[StoredRecord], findings: &mut Vec<Finding>) {
    let phone_re = Regex::new(r"^[0-9]{7,15}$").expect("static pattern");
    let email_re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static pattern");

    let mut phones: HashMap<String, Vec<String>> = HashMap::new();
    let mut emails: HashMap<String, Vec<String>> = HashMap::new();
    let mut active_super_admins = 0usize;

    for record in users {
        let user = match User::from_record(record) {
            Ok(user) => user,
            Err(e) => {
                findings.push(Finding::record(
                    FindingCode::MalformedRecord,
                    Collections::USERS,
                    &record.id,
                    e.to_string(),
                ));
                continue;
            }
        };

        if !phone_re.is_match(&user.phone) {
            findings.push(Finding::record(
                FindingCode::InvalidPhone,
                Collections::USERS,
                &record.id,
                format!("phone '{}' is not a plausible number", user.phone),
            ));
        }
        phones.entry(user.phone.clone()).or_default().push(record.id.clone());

        if let Some(email) = &user.email {
            if !email_re.is_match(email) {
                findings.push(Finding::record(
                    FindingCode::InvalidEmail,
                    Collections::USERS,
                    &record.id,
                    format!("email '{}' is not a plausible address", email),
                ));
            }
            emails.entry(email.clone()).or_default().push(record.id.clone());
        }

        if !known_roles().contains(&user.role.as_str()) {
            findings.push(Finding::record(
                FindingCode::UnknownRole,
                Collections::USERS,
                &record.id,
                format!("role '{}' is not in the catalog", user.role),
            ));
        }

        if user.is_super_admin() {
            if user.is_active {
                active_super_admins += 1;
            } else {
                findings.push(Finding::record(
                    FindingCode::InactiveSuperAdmin,
                    Collections::USERS,
                    &record.id,
                    format!("super admin {} is deactivated", user.phone),
                ));
            }
        }
    }

    for (phone, ids) in phones {
        if ids.len() > 1 {
            findings.push(Finding::collection(
                FindingCode::DuplicatePhone,
                Collections::USERS,
                format!("phone '{}' is shared by records {}", phone, ids.join(", ")),
            ));
        }
    }

    for (email, ids) in emails {
        if ids.len() > 1 {
            findings.push(Finding::collection(
                FindingCode::DuplicateEmail,
                Collections::USERS,
                format!("email '{}' is shared by records {}", email, ids.join(", ")),
            ));
        }
    }

    if active_super_admins == 0 {
        findings.push(Finding::collection(
            FindingCode::NoSuperAdmin,
            Collections::USERS,
            format!("no active {} account exists", ROLE_SUPER_ADMIN),
        ));
    }
}

/// user_roles rows must reference an existing user and role, once
fn check_user_roles(
    user_roles: &[StoredRecord],
    user_ids: &HashSet<&str>,
    role_ids: &HashSet<&str>,
    findings: &mut Vec<Finding>,
) {
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for record in user_roles {
        let (user_id, role_id) = match (record.str_field("user_id"), record.str_field("role_id")) {
            (Some(u), Some(r)) => (u.to_string(), r.to_string()),
            _ => {
                findings.push(Finding::record(
                    FindingCode::MalformedRecord,
                    Collections::USER_ROLES,
                    &record.id,
                    "missing user_id or role_id",
                ));
                continue;
            }
        };

        if !user_ids.contains(user_id.as_str()) {
            findings.push(Finding::record(
                FindingCode::OrphanedUserRole,
                Collections::USER_ROLES,
                &record.id,
                format!("references missing user {}", user_id),
            ));
        }

        if !role_ids.contains(role_id.as_str()) {
            findings.push(Finding::record(
                FindingCode::DanglingRole,
                Collections::USER_ROLES,
                &record.id,
                format!("references missing role {}", role_id),
            ));
        }

        if !seen.insert((user_id.clone(), role_id.clone())) {
            findings.push(Finding::record(
                FindingCode::DuplicateGrant,
                Collections::USER_ROLES,
                &record.id,
                format!("user {} already has role {}", user_id, role_id),
            ));
        }
    }
}

/// role_permissions rows must reference an existing role and
/// permission, once
fn check_role_permissions(
    role_permissions: &[StoredRecord],
    role_ids: &HashSet<&str>,
    permission_ids: &HashSet<&str>,
    findings: &mut Vec<Finding>,
) {
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for record in role_permissions {
        let (role_id, permission_id) = match (
            record.str_field("role_id"),
            record.str_field("permission_id"),
        ) {
            (Some(r), Some(p)) => (r.to_string(), p.to_string()),
            _ => {
                findings.push(Finding::record(
                    FindingCode::MalformedRecord,
                    Collections::ROLE_PERMISSIONS,
                    &record.id,
                    "missing role_id or permission_id",
                ));
                continue;
            }
        };

        if !role_ids.contains(role_id.as_str()) {
            findings.push(Finding::record(
                FindingCode::DanglingRole,
                Collections::ROLE_PERMISSIONS,
                &record.id,
                format!("references missing role {}", role_id),
            ));
        }

        if !permission_ids.contains(permission_id.as_str()) {
            findings.push(Finding::record(
                FindingCode::OrphanedRolePermission,
                Collections::ROLE_PERMISSIONS,
                &record.id,
                format!("references missing permission {}", permission_id),
            ));
        }

        if !seen.insert((role_id.clone(), permission_id.clone())) {
            findings.push(Finding::record(
                FindingCode::DuplicateGrant,
                Collections::ROLE_PERMISSIONS,
                &record.id,
                format!("role {} already has permission {}", role_id, permission_id),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::PasswordPolicy;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn seed_admin(store: &MemoryStore, phone: &str) {
        let user = User::new_super_admin(
            phone,
            Some(format!("{}@example.com", phone)),
            "Admin",
            "User",
            "password123",
            &PasswordPolicy::default(),
        )
        .unwrap();
        store.insert(&user.to_record().unwrap()).unwrap();
    }

    fn codes(report: &IntegrityReport) -> Vec<FindingCode> {
        report.findings.iter().map(|f| f.code).collect()
    }

    #[test]
    fn test_clean_store_has_no_findings() {
        let store = MemoryStore::new();
        seed_admin(&store, "9342547471");

        let report = audit_all(&store).unwrap();
        assert!(report.is_clean(), "unexpected findings: {:?}", report.findings);
        assert_eq!(report.records_checked, 1);
    }

    #[test]
    fn test_duplicate_phone_detected() {
        let store = MemoryStore::new();
        seed_admin(&store, "9342547471");

        // Second record with the same phone, different id and email
        let mut user = User::new_super_admin(
            "9342547471",
            Some("other@example.com".to_string()),
            "Other",
            "Admin",
            "password123",
            &PasswordPolicy::default(),
        )
        .unwrap();
        user.id = uuid::Uuid::new_v4();
        store.insert(&user.to_record().unwrap()).unwrap();

        let report = audit_all(&store).unwrap();
        assert!(codes(&report).contains(&FindingCode::DuplicatePhone));
    }

    #[test]
    fn test_malformed_user_detected() {
        let store = MemoryStore::new();
        seed_admin(&store, "9342547471");
        store
            .insert(&StoredRecord::new(
                Collections::USERS,
                "broken",
                json!({"phone": "123"}),
            ))
            .unwrap();

        let report = audit_all(&store).unwrap();
        assert!(codes(&report).contains(&FindingCode::MalformedRecord));
    }

    #[test]
    fn test_missing_super_admin_detected() {
        let store = MemoryStore::new();

        let report = audit_all(&store).unwrap();
        assert!(codes(&report).contains(&FindingCode::NoSuperAdmin));
    }

    #[test]
    fn test_orphaned_user_role_detected() {
        let store = MemoryStore::new();
        seed_admin(&store, "9342547471");
        store
            .insert(&StoredRecord::new(
                Collections::ROLES,
                "r1",
                json!({"name": "STAFF"}),
            ))
            .unwrap();
        store
            .insert(&StoredRecord::new(
                Collections::USER_ROLES,
                "ur1",
                json!({"user_id": "ghost", "role_id": "r1"}),
            ))
            .unwrap();

        let report = verify_permissions(&store).unwrap();
        assert_eq!(codes(&report), vec![FindingCode::OrphanedUserRole]);
    }

    #[test]
    fn test_orphaned_and_duplicate_grants_detected() {
        let store = MemoryStore::new();
        store
            .insert(&StoredRecord::new(
                Collections::ROLES,
                "r1",
                json!({"name": "STAFF"}),
            ))
            .unwrap();
        store
            .insert(&StoredRecord::new(
                Collections::ROLE_PERMISSIONS,
                "rp1",
                json!({"role_id": "r1", "permission_id": "missing"}),
            ))
            .unwrap();
        store
            .insert(&StoredRecord::new(
                Collections::ROLE_PERMISSIONS,
                "rp2",
                json!({"role_id": "r1", "permission_id": "missing"}),
            ))
            .unwrap();

        let report = verify_permissions(&store).unwrap();
        let found = codes(&report);
        assert!(found.contains(&FindingCode::OrphanedRolePermission));
        assert!(found.contains(&FindingCode::DuplicateGrant));
    }

    #[test]
    fn test_unknown_role_and_inactive_super_admin() {
        let store = MemoryStore::new();
        seed_admin(&store, "9342547471");

        let mut rogue = User::new_super_admin(
            "9000000001",
            None,
            "Rogue",
            "User",
            "password123",
            &PasswordPolicy::default(),
        )
        .unwrap();
        rogue.role = "WIZARD".to_string();
        // to_record validates the role, so store the raw document
        let body = serde_json::to_value(&rogue).unwrap();
        store
            .insert(&StoredRecord::new(
                Collections::USERS,
                rogue.id.to_string(),
                body,
            ))
            .unwrap();

        let mut sleeping = User::new_super_admin(
            "9000000002",
            None,
            "Sleeping",
            "Admin",
            "password123",
            &PasswordPolicy::default(),
        )
        .unwrap();
        sleeping.is_active = false;
        store.insert(&sleeping.to_record().unwrap()).unwrap();

        let report = audit_all(&store).unwrap();
        let found = codes(&report);
        assert!(found.contains(&FindingCode::UnknownRole));
        assert!(found.contains(&FindingCode::InactiveSuperAdmin));
    }

    #[test]
    fn test_unreachable_store_aborts_audit() {
        let store = MemoryStore::new();
        store.set_unreachable(true);

        assert!(audit_all(&store).is_err());
    }
}
