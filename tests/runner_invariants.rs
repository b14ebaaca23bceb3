//! Destructive-Operation Runner Invariant Tests
//!
//! Tests for the runner's core guarantees:
//! - Zero matches: no writes, no confirmation prompt
//! - records_changed <= records_matched, always
//! - Confirmation gate: declining mutates nothing
//! - Dry-run: never changes records, never writes the rollback log
//! - Partial failure: one record's failure stops nothing else

use adminctl::query::{FilterOp, TargetQuery};
use adminctl::runner::{
    ActionError, ActionOutcome, OperationDescriptor, OperationRunner, RollbackLog, StaticGate,
};
use adminctl::store::{DataStore, MemoryStore, StoredRecord};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn rollback_log(temp_dir: &TempDir) -> RollbackLog {
    RollbackLog::open(temp_dir.path().join("rollback")).unwrap()
}

fn seed_users(store: &MemoryStore, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let id = format!("user_{:02}", i);
            store
                .insert(&StoredRecord::new(
                    "users",
                    &id,
                    json!({"is_active": true, "phone": format!("900000{:04}", i)}),
                ))
                .unwrap();
            id
        })
        .collect()
}

fn deactivate_all() -> OperationDescriptor {
    OperationDescriptor::new(
        "deactivate-users",
        TargetQuery::all("users"),
        true,
        |record| {
            let mut body = record.body.clone();
            body["is_active"] = json!(false);
            Ok(ActionOutcome::Mutate(body))
        },
    )
}

// =============================================================================
// Zero-Match Runs
// =============================================================================

/// A target query matching nothing yields records_matched == 0 and
/// performs no writes.
#[test]
fn test_zero_matches_reports_zero_and_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let log = rollback_log(&temp_dir);
    let runner = OperationRunner::new(&store, &log);

    let gate = StaticGate::new(true);
    let report = runner.run(&deactivate_all(), false, &gate).unwrap();

    assert_eq!(report.records_matched, 0);
    assert_eq!(report.records_changed, 0);
    assert!(!report.aborted);
    assert!(report.errors.is_empty());
    assert!(log.list().unwrap().is_empty());
    // Nothing to confirm when nothing matched
    assert_eq!(gate.calls(), 0);
}

// =============================================================================
// records_changed <= records_matched
// =============================================================================

/// The changed count can never exceed the matched count, whatever the
/// action does.
#[test]
fn test_changed_never_exceeds_matched() {
    let temp_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    seed_users(&store, 7);
    let log = rollback_log(&temp_dir);
    let runner = OperationRunner::new(&store, &log);

    // Action that fails on every other record
    let descriptor = OperationDescriptor::new(
        "flaky-repair",
        TargetQuery::all("users"),
        true,
        |record| {
            let n: usize = record.id.trim_start_matches("user_").parse().unwrap();
            if n % 2 == 0 {
                Ok(ActionOutcome::Delete)
            } else {
                Err(ActionError::new("odd record"))
            }
        },
    );

    let report = runner
        .run(&descriptor, false, &StaticGate::new(true))
        .unwrap();

    assert_eq!(report.records_matched, 7);
    assert!(report.records_changed <= report.records_matched);
    assert_eq!(report.records_changed, 4);
    assert_eq!(report.errors.len(), 3);
}

// =============================================================================
// Confirmation Gate
// =============================================================================

/// If the gate declines, no record is mutated and the report is
/// marked aborted.
#[test]
fn test_declined_confirmation_mutates_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let ids = seed_users(&store, 5);
    let log = rollback_log(&temp_dir);
    let runner = OperationRunner::new(&store, &log);

    let gate = StaticGate::new(false);
    let report = runner.run(&deactivate_all(), false, &gate).unwrap();

    assert!(report.aborted);
    assert_eq!(report.records_changed, 0);
    assert_eq!(gate.calls(), 1);

    for id in &ids {
        let record = store.get("users", id).unwrap().unwrap();
        assert_eq!(record.bool_field("is_active"), Some(true));
    }
}

/// The gate is asked exactly once per run, after the match count is
/// known.
#[test]
fn test_confirmation_asked_exactly_once() {
    let temp_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    seed_users(&store, 3);
    let log = rollback_log(&temp_dir);
    let runner = OperationRunner::new(&store, &log);

    let gate = StaticGate::new(true);
    runner.run(&deactivate_all(), false, &gate).unwrap();

    assert_eq!(gate.calls(), 1);
}

// =============================================================================
// Dry-Run Idempotence
// =============================================================================

/// Dry runs never change records and never write to the rollback log,
/// however often they repeat.
#[test]
fn test_dry_run_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let ids = seed_users(&store, 4);
    let log = rollback_log(&temp_dir);
    let runner = OperationRunner::new(&store, &log);

    for _ in 0..3 {
        let report = runner
            .run(&deactivate_all(), true, &StaticGate::new(true))
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.records_matched, 4);
        assert_eq!(report.records_changed, 0);
        assert_eq!(report.operation_id, None);
    }

    assert!(log.list().unwrap().is_empty());
    for id in &ids {
        let record = store.get("users", id).unwrap().unwrap();
        assert_eq!(record.bool_field("is_active"), Some(true));
    }
}

/// A dry run evaluates actions so the operator sees which records
/// would fail, without applying anything.
#[test]
fn test_dry_run_previews_action_failures() {
    let temp_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    seed_users(&store, 3);
    let log = rollback_log(&temp_dir);
    let runner = OperationRunner::new(&store, &log);

    let descriptor = OperationDescriptor::new(
        "flaky-repair",
        TargetQuery::all("users"),
        true,
        |record| {
            if record.id == "user_01" {
                Err(ActionError::new("cannot repair"))
            } else {
                Ok(ActionOutcome::Delete)
            }
        },
    );

    let report = runner.run(&descriptor, true, &StaticGate::new(true)).unwrap();

    assert_eq!(report.records_changed, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].record_id, "user_01");
    // Nothing was deleted
    assert_eq!(store.query(&TargetQuery::all("users")).unwrap().len(), 3);
}

// =============================================================================
// Partial Failure
// =============================================================================

/// 10 matching records, the action raises on record #5: the report
/// shows matched=10, changed=9, and exactly that record in errors.
#[test]
fn test_ten_records_one_failure() {
    let temp_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    seed_users(&store, 10);
    let log = rollback_log(&temp_dir);
    let runner = OperationRunner::new(&store, &log);

    let descriptor = OperationDescriptor::new(
        "deactivate-users",
        TargetQuery::all("users"),
        true,
        |record| {
            if record.id == "user_05" {
                return Err(ActionError::new("record is locked"));
            }
            let mut body = record.body.clone();
            body["is_active"] = json!(false);
            Ok(ActionOutcome::Mutate(body))
        },
    );

    let report = runner
        .run(&descriptor, false, &StaticGate::new(true))
        .unwrap();

    assert_eq!(report.records_matched, 10);
    assert_eq!(report.records_changed, 9);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].record_id, "user_05");
    assert_eq!(report.errors[0].reason, "record is locked");
    assert!(report.is_partial_failure());

    // The failing record kept its pre-image; all others changed
    let locked = store.get("users", "user_05").unwrap().unwrap();
    assert_eq!(locked.bool_field("is_active"), Some(true));

    let still_active = store
        .query(&TargetQuery::all("users").with("is_active", FilterOp::Eq(json!(true))))
        .unwrap();
    assert_eq!(still_active.len(), 1);
}

/// Records added to the target set after the snapshot are ignored:
/// the runner mutates only what it matched at snapshot time.
#[test]
fn test_never_mutates_more_than_matched() {
    let temp_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    seed_users(&store, 3);
    let log = rollback_log(&temp_dir);
    let runner = OperationRunner::new(&store, &log);

    let report = runner
        .run(&deactivate_all(), false, &StaticGate::new(true))
        .unwrap();
    assert_eq!(report.records_matched, 3);
    assert_eq!(report.records_changed, 3);

    // A record inserted after the run is untouched by that run
    store
        .insert(&StoredRecord::new(
            "users",
            "late",
            json!({"is_active": true}),
        ))
        .unwrap();
    let late = store.get("users", "late").unwrap().unwrap();
    assert_eq!(late.bool_field("is_active"), Some(true));
}
