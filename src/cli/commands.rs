//! CLI command implementations
//!
//! Read-only commands query and report. Destructive commands build an
//! operation descriptor and hand it to the runner, so every one of
//! them is confirmed, snapshotted, and recorded in the ops log the
//! same way.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::admin::{generate_password, hash_password, Collections, PasswordPolicy, User,
    ROLE_SUPER_ADMIN};
use crate::integrity;
use crate::observability::{FileOpsLog, Logger, OpsAction, OpsLog, OpsOutcome, OpsRecord};
use crate::query::{FilterOp, TargetQuery};
use crate::runner::{
    ActionError, ActionOutcome, AssumeYes, ConfirmationGate, ExecutionReport, OperationDescriptor,
    OperationRunner, RollbackLog, StdinConfirmation,
};
use crate::store::{DataStore, FileStore};

use super::args::{Cli, CleanupTarget, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// Minimum password length (optional, default 8)
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// Ops log path (optional, default `<data_dir>/ops_audit.log`)
    #[serde(default)]
    pub ops_log: Option<String>,
}

fn default_min_password_length() -> usize {
    8
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> CliResult<()> {
        if self.data_dir.is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }

        if self.min_password_length == 0 {
            return Err(CliError::config_error("min_password_length must be > 0"));
        }

        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    /// Rollback log directory
    pub fn rollback_path(&self) -> PathBuf {
        self.data_path().join("rollback")
    }

    /// Ops log file path
    pub fn ops_log_path(&self) -> PathBuf {
        match &self.ops_log {
            Some(path) => PathBuf::from(path),
            None => self.data_path().join("ops_audit.log"),
        }
    }

    /// Password policy derived from the config
    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            min_length: self.min_password_length,
        }
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call. Fatal errors
/// are also emitted as a JSON error object so scripted callers never
/// have to parse stderr.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();

    if let Err(e) = run_command(cli.command) {
        write_error(e.code_str(), e.message()).ok();
        return Err(e);
    }

    Ok(())
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::CreateAdmin {
            config,
            phone,
            email,
            first_name,
            last_name,
            password,
            generate_password,
            yes,
        } => create_admin(
            &config,
            &phone,
            email,
            &first_name,
            &last_name,
            password,
            generate_password,
            yes,
        ),
        Command::ResetPassword {
            config,
            phone,
            password,
            generate_password,
            dry_run,
            yes,
        } => reset_password(&config, &phone, password, generate_password, dry_run, yes),
        Command::ListAdmins { config } => list_admins(&config),
        Command::FindUser {
            config,
            phone,
            email,
            name,
        } => find_user(&config, phone, email, name),
        Command::Audit { config } => audit(&config),
        Command::VerifyPerms { config } => verify_perms(&config),
        Command::Cleanup {
            config,
            target,
            older_than_days,
            dry_run,
            yes,
        } => cleanup(&config, target, older_than_days, dry_run, yes),
        Command::Rollback {
            config,
            operation,
            yes,
        } => rollback(&config, &operation, yes),
        Command::Operations { config } => operations(&config),
    }
}

/// Everything an opened command needs
struct Env {
    config: Config,
    store: FileStore,
    rollback_log: RollbackLog,
    ops: FileOpsLog,
}

/// Loads config and opens the store, rollback log, and ops log.
/// Fails with NotInitialized before touching anything else.
fn open_env(config_path: &Path) -> CliResult<Env> {
    let config = Config::load(config_path)?;

    if !is_initialized(config.data_path()) {
        return Err(CliError::not_initialized());
    }

    let store = FileStore::open(config.data_path())?;
    let rollback_log = RollbackLog::open(config.rollback_path())?;
    let ops = FileOpsLog::open(config.ops_log_path())
        .map_err(|e| CliError::io_error(format!("Failed to open ops log: {}", e)))?;

    Ok(Env {
        config,
        store,
        rollback_log,
        ops,
    })
}

/// Check if a data directory is initialized
fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join("data").exists() && data_dir.join("rollback").exists()
}

/// The gate for a destructive command: interactive unless `--yes`
fn make_gate(yes: bool) -> Box<dyn ConfirmationGate> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirmation)
    }
}

/// Initialize the data and rollback directories
///
/// Does not create any records; the application owns the schema. Run
/// once per data directory.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let data_dir = config.data_path();

    if is_initialized(data_dir) {
        return Err(CliError::already_initialized());
    }

    let dirs = [data_dir.join("data"), data_dir.join("rollback")];

    for dir in &dirs {
        fs::create_dir_all(dir).map_err(|e| {
            CliError::config_error(format!("Failed to create directory {:?}: {}", dir, e))
        })?;
    }

    write_response(json!({"initialized": true}))?;

    Ok(())
}

/// Create a super admin account
#[allow(clippy::too_many_arguments)]
pub fn create_admin(
    config_path: &Path,
    phone: &str,
    email: Option<String>,
    first_name: &str,
    last_name: &str,
    password: Option<String>,
    generate: bool,
    yes: bool,
) -> CliResult<()> {
    let env = open_env(config_path)?;
    let policy = env.config.password_policy();

    // Uniqueness checks before anything is prompted
    let same_phone = env.store.query(
        &TargetQuery::all(Collections::USERS).with("phone", FilterOp::Eq(json!(phone))),
    )?;
    if !same_phone.is_empty() {
        return Err(CliError::validation(format!(
            "User with phone {} already exists",
            phone
        )));
    }

    if let Some(email) = &email {
        let same_email = env.store.query(
            &TargetQuery::all(Collections::USERS).with("email", FilterOp::Eq(json!(email))),
        )?;
        if !same_email.is_empty() {
            return Err(CliError::validation(format!(
                "User with email {} already exists",
                email
            )));
        }
    }

    let (password, generated) = match (password, generate) {
        (Some(p), _) => (p, None),
        (None, true) => {
            let p = generate_password(&policy);
            (p.clone(), Some(p))
        }
        (None, false) => {
            return Err(CliError::validation(
                "Provide --password or --generate-password",
            ))
        }
    };

    let user = User::new_super_admin(phone, email, first_name, last_name, &password, &policy)?;

    let operation = "create-admin";
    env.ops
        .append(
            &OpsRecord::new(OpsAction::OperationRequested, OpsOutcome::Pending)
                .with_operation(operation),
        )
        .ok();

    let gate = make_gate(yes);
    if !gate.confirm(&format!("{} {}", operation, user.phone), 1) {
        env.ops
            .append(
                &OpsRecord::new(OpsAction::ConfirmationRejected, OpsOutcome::Rejected)
                    .with_operation(operation),
            )
            .ok();
        return write_response(json!({"created": false, "aborted": true}));
    }

    env.store.insert(&user.to_record()?)?;

    env.ops
        .append(
            &OpsRecord::new(OpsAction::OperationExecuted, OpsOutcome::Success)
                .with_operation(operation)
                .with_records(1),
        )
        .ok();
    Logger::info(
        "ADMIN_CREATED",
        &[("phone", user.phone.as_str()), ("user_id", &user.id.to_string())],
    );

    write_response(json!({
        "created": true,
        "user": user.summary(),
        "generated_password": generated,
    }))
}

/// Reset a user's password through the runner
pub fn reset_password(
    config_path: &Path,
    phone: &str,
    password: Option<String>,
    generate: bool,
    dry_run: bool,
    yes: bool,
) -> CliResult<()> {
    let env = open_env(config_path)?;
    let policy = env.config.password_policy();

    let (password, generated) = match (password, generate) {
        (Some(p), _) => (p, None),
        (None, true) => {
            let p = generate_password(&policy);
            (p.clone(), Some(p))
        }
        (None, false) => {
            return Err(CliError::validation(
                "Provide --password or --generate-password",
            ))
        }
    };
    policy.validate(&password)?;

    let hash = hash_password(&password)?;
    let updated_at = json!(Utc::now());

    let descriptor = OperationDescriptor::new(
        "reset-password",
        TargetQuery::all(Collections::USERS).with("phone", FilterOp::Eq(json!(phone))),
        true,
        move |record| {
            let mut body = record.body.clone();
            body["password_hash"] = json!(hash.clone());
            body["updated_at"] = updated_at.clone();
            Ok(ActionOutcome::Mutate(body))
        },
    );

    let report = run_destructive(&env, &descriptor, dry_run, yes)?;

    // Only reveal a generated password when it actually took effect
    let generated = if report.records_changed > 0 {
        generated
    } else {
        None
    };

    write_response(json!({
        "report": report,
        "generated_password": generated,
    }))
}

/// List super admin accounts
pub fn list_admins(config_path: &Path) -> CliResult<()> {
    let env = open_env(config_path)?;

    let records = env.store.query(
        &TargetQuery::all(Collections::USERS)
            .with("role", FilterOp::Eq(json!(ROLE_SUPER_ADMIN))),
    )?;

    let admins: Vec<_> = records
        .iter()
        .filter_map(|record| match User::from_record(record) {
            Ok(user) => Some(user.summary()),
            Err(e) => {
                Logger::warn(
                    "MALFORMED_USER_SKIPPED",
                    &[("record_id", record.id.as_str()), ("reason", &e.to_string())],
                );
                None
            }
        })
        .collect();

    write_response(json!({"count": admins.len(), "admins": admins}))
}

/// Search user records by phone, email, or name substring
pub fn find_user(
    config_path: &Path,
    phone: Option<String>,
    email: Option<String>,
    name: Option<String>,
) -> CliResult<()> {
    if phone.is_none() && email.is_none() && name.is_none() {
        return Err(CliError::validation(
            "Provide at least one of --phone, --email, --name",
        ));
    }

    let env = open_env(config_path)?;

    let mut target = TargetQuery::all(Collections::USERS);
    if let Some(phone) = &phone {
        target = target.with("phone", FilterOp::Eq(json!(phone)));
    }
    if let Some(email) = &email {
        target = target.with("email", FilterOp::Eq(json!(email)));
    }

    let records = env.store.query(&target)?;

    let needle = name.map(|n| n.to_lowercase());
    let users: Vec<_> = records
        .iter()
        .filter_map(|record| User::from_record(record).ok())
        .filter(|user| match &needle {
            Some(needle) => user.full_name().to_lowercase().contains(needle),
            None => true,
        })
        .map(|user| user.summary())
        .collect();

    write_response(json!({"count": users.len(), "users": users}))
}

/// Run every database integrity check
pub fn audit(config_path: &Path) -> CliResult<()> {
    let env = open_env(config_path)?;

    let report = integrity::audit_all(&env.store)?;

    if !report.is_clean() {
        Logger::warn(
            "INTEGRITY_FINDINGS",
            &[("count", &report.findings.len().to_string())],
        );
    }

    write_response(json!({
        "records_checked": report.records_checked,
        "clean": report.is_clean(),
        "findings": report.findings,
    }))
}

/// Verify role and permission assignments
pub fn verify_perms(config_path: &Path) -> CliResult<()> {
    let env = open_env(config_path)?;

    let report = integrity::verify_permissions(&env.store)?;

    write_response(json!({
        "records_checked": report.records_checked,
        "clean": report.is_clean(),
        "findings": report.findings,
    }))
}

/// Run a destructive cleanup target
pub fn cleanup(
    config_path: &Path,
    target: CleanupTarget,
    older_than_days: i64,
    dry_run: bool,
    yes: bool,
) -> CliResult<()> {
    let env = open_env(config_path)?;

    let descriptors = match target {
        CleanupTarget::ExpiredOtps => vec![expired_otps_descriptor()],
        CleanupTarget::InactiveUsers => vec![inactive_users_descriptor(older_than_days)],
        CleanupTarget::OrphanedGrants => orphaned_grants_descriptors(&env.store)?,
    };

    let mut reports = Vec::new();
    for descriptor in descriptors {
        reports.push(run_destructive(&env, &descriptor, dry_run, yes)?);
    }

    write_response(json!({"reports": reports}))
}

/// Delete OTP records past their expiry
fn expired_otps_descriptor() -> OperationDescriptor {
    let cutoff = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    OperationDescriptor::new(
        "purge-expired-otps",
        TargetQuery::all(Collections::OTPS).with("expires_at", FilterOp::Lt(json!(cutoff))),
        true,
        |_| Ok(ActionOutcome::Delete),
    )
}

/// Deactivate accounts with no login inside the window.
///
/// Accounts that never logged in are left alone; `last_login` is
/// absent there and absent fields match no comparison.
fn inactive_users_descriptor(older_than_days: i64) -> OperationDescriptor {
    let cutoff = (Utc::now() - Duration::days(older_than_days))
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    OperationDescriptor::new(
        "deactivate-inactive-users",
        TargetQuery::all(Collections::USERS)
            .with("is_active", FilterOp::Eq(json!(true)))
            .with("last_login", FilterOp::Lt(json!(cutoff))),
        true,
        |record| {
            let mut body = record.body.clone();
            body["is_active"] = json!(false);
            Ok(ActionOutcome::Mutate(body))
        },
    )
}

/// Delete grant rows whose referenced user, role, or permission no
/// longer exists. One descriptor per grant collection, so each gets
/// its own snapshot and operation id.
fn orphaned_grants_descriptors(store: &dyn DataStore) -> CliResult<Vec<OperationDescriptor>> {
    let ids = |collection: &str| -> CliResult<HashSet<String>> {
        Ok(store
            .query(&TargetQuery::all(collection))?
            .into_iter()
            .map(|r| r.id)
            .collect())
    };

    let user_ids = ids(Collections::USERS)?;
    let role_ids = ids(Collections::ROLES)?;
    let permission_ids = ids(Collections::PERMISSIONS)?;

    let roles_for_user_grants = role_ids.clone();
    let user_roles = OperationDescriptor::new(
        "purge-orphaned-user-roles",
        TargetQuery::all(Collections::USER_ROLES),
        true,
        move |record| {
            let user_id = record
                .str_field("user_id")
                .ok_or_else(|| ActionError::new("missing user_id"))?;
            let role_id = record
                .str_field("role_id")
                .ok_or_else(|| ActionError::new("missing role_id"))?;

            if user_ids.contains(user_id) && roles_for_user_grants.contains(role_id) {
                Ok(ActionOutcome::Keep)
            } else {
                Ok(ActionOutcome::Delete)
            }
        },
    );

    let role_permissions = OperationDescriptor::new(
        "purge-orphaned-role-permissions",
        TargetQuery::all(Collections::ROLE_PERMISSIONS),
        true,
        move |record| {
            let role_id = record
                .str_field("role_id")
                .ok_or_else(|| ActionError::new("missing role_id"))?;
            let permission_id = record
                .str_field("permission_id")
                .ok_or_else(|| ActionError::new("missing permission_id"))?;

            if role_ids.contains(role_id) && permission_ids.contains(permission_id) {
                Ok(ActionOutcome::Keep)
            } else {
                Ok(ActionOutcome::Delete)
            }
        },
    );

    Ok(vec![user_roles, role_permissions])
}

/// Runs one descriptor through the runner with ops-log entries around
/// it
fn run_destructive(
    env: &Env,
    descriptor: &OperationDescriptor,
    dry_run: bool,
    yes: bool,
) -> CliResult<ExecutionReport> {
    env.ops
        .append(
            &OpsRecord::new(OpsAction::OperationRequested, OpsOutcome::Pending)
                .with_operation(descriptor.name()),
        )
        .ok();

    let runner = OperationRunner::new(&env.store, &env.rollback_log);
    let gate = make_gate(yes);

    let report = match runner.run(descriptor, dry_run, gate.as_ref()) {
        Ok(report) => report,
        Err(e) => {
            env.ops
                .append(
                    &OpsRecord::new(OpsAction::OperationFailed, OpsOutcome::Failed)
                        .with_operation(descriptor.name())
                        .with_error(e.to_string()),
                )
                .ok();
            Logger::error(
                "OPERATION_FAILED",
                &[("operation", descriptor.name()), ("error", &e.to_string())],
            );
            return Err(e.into());
        }
    };

    if report.aborted {
        env.ops
            .append(
                &OpsRecord::new(OpsAction::ConfirmationRejected, OpsOutcome::Rejected)
                    .with_operation(descriptor.name())
                    .with_records(report.records_matched),
            )
            .ok();
    } else if !dry_run {
        let mut record = OpsRecord::new(OpsAction::OperationExecuted, OpsOutcome::Success)
            .with_operation(descriptor.name())
            .with_records(report.records_changed);
        if let Some(id) = &report.operation_id {
            record = record.with_operation_id(id);
        }
        env.ops.append(&record).ok();

        Logger::info(
            "OPERATION_COMPLETE",
            &[
                ("operation", descriptor.name()),
                ("matched", &report.records_matched.to_string()),
                ("changed", &report.records_changed.to_string()),
                ("errors", &report.errors.len().to_string()),
            ],
        );
    }

    Ok(report)
}

/// Replay a recorded snapshot to restore prior state
pub fn rollback(config_path: &Path, operation_id: &str, yes: bool) -> CliResult<()> {
    let env = open_env(config_path)?;

    env.ops
        .append(
            &OpsRecord::new(OpsAction::OperationRequested, OpsOutcome::Pending)
                .with_operation("rollback")
                .with_operation_id(operation_id),
        )
        .ok();

    let runner = OperationRunner::new(&env.store, &env.rollback_log);
    let gate = make_gate(yes);

    let report = match runner.rollback(operation_id, gate.as_ref()) {
        Ok(report) => report,
        Err(e) => {
            env.ops
                .append(
                    &OpsRecord::new(OpsAction::OperationFailed, OpsOutcome::Failed)
                        .with_operation("rollback")
                        .with_operation_id(operation_id)
                        .with_error(e.to_string()),
                )
                .ok();
            return Err(e.into());
        }
    };

    if report.aborted {
        env.ops
            .append(
                &OpsRecord::new(OpsAction::ConfirmationRejected, OpsOutcome::Rejected)
                    .with_operation("rollback")
                    .with_operation_id(operation_id),
            )
            .ok();
    } else {
        env.ops
            .append(
                &OpsRecord::new(OpsAction::OperationRolledBack, OpsOutcome::Success)
                    .with_operation_id(operation_id)
                    .with_records(report.records_restored),
            )
            .ok();
        Logger::info(
            "ROLLBACK_COMPLETE",
            &[
                ("operation_id", operation_id),
                ("restored", &report.records_restored.to_string()),
            ],
        );
    }

    write_response(json!(report))
}

/// List recorded operations in the rollback log
pub fn operations(config_path: &Path) -> CliResult<()> {
    let env = open_env(config_path)?;

    let entries = env.rollback_log.list()?;
    write_response(json!({"count": entries.len(), "operations": entries}))
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use tempfile::TempDir;

    fn create_config(temp_dir: &TempDir) -> PathBuf {
        let config_path = temp_dir.path().join("adminctl.json");
        let data_dir = temp_dir.path().join("data");

        let config = json!({
            "data_dir": data_dir.to_string_lossy()
        });

        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    #[test]
    fn test_init_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        let data_dir = temp_dir.path().join("data");

        init(&config_path).unwrap();

        assert!(data_dir.join("data").exists());
        assert!(data_dir.join("rollback").exists());
    }

    #[test]
    fn test_init_refuses_reinit() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        init(&config_path).unwrap();

        let result = init(&config_path);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().code(),
            &CliErrorCode::AlreadyInitialized
        );
    }

    #[test]
    fn test_commands_require_init() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let result = audit(&config_path);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code(), &CliErrorCode::NotInitialized);
    }

    #[test]
    fn test_config_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.min_password_length, 8);
        assert_eq!(
            config.ops_log_path(),
            config.data_path().join("ops_audit.log")
        );
    }

    #[test]
    fn test_config_validates_password_length() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("adminctl.json");

        let config = json!({
            "data_dir": temp_dir.path().join("data").to_string_lossy(),
            "min_password_length": 0
        });
        fs::write(&config_path, config.to_string()).unwrap();

        assert!(Config::load(&config_path).is_err());
    }

    #[test]
    fn test_create_admin_rejects_duplicate_phone() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        init(&config_path).unwrap();

        create_admin(
            &config_path,
            "9342547471",
            None,
            "Asha",
            "Iyer",
            Some("password123".to_string()),
            false,
            true,
        )
        .unwrap();

        let result = create_admin(
            &config_path,
            "9342547471",
            None,
            "Other",
            "Admin",
            Some("password123".to_string()),
            false,
            true,
        );
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code(), &CliErrorCode::ValidationError);
    }

    #[test]
    fn test_create_admin_requires_a_password_source() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        init(&config_path).unwrap();

        let result = create_admin(
            &config_path, "9342547471", None, "A", "B", None, false, true,
        );
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code(), &CliErrorCode::ValidationError);
    }

    #[test]
    fn test_find_user_requires_a_criterion() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        init(&config_path).unwrap();

        let result = find_user(&config_path, None, None, None);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code(), &CliErrorCode::ValidationError);
    }

    #[test]
    fn test_ops_log_records_create_admin() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        init(&config_path).unwrap();

        create_admin(
            &config_path,
            "9342547471",
            None,
            "Asha",
            "Iyer",
            Some("password123".to_string()),
            false,
            true,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        let contents = fs::read_to_string(config.ops_log_path()).unwrap();
        assert!(contents.contains("OPERATION_REQUESTED"));
        assert!(contents.contains("OPERATION_EXECUTED"));
        assert!(contents.contains("create-admin"));
    }
}
