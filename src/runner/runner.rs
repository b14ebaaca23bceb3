//! Operation execution
//!
//! `OperationRunner` owns the run sequence for destructive operations
//! and the snapshot replay for rollbacks. It never prints; callers
//! render the returned reports.

use std::collections::HashSet;

use chrono::Utc;

use crate::store::{DataStore, StoredRecord};

use super::confirm::ConfirmationGate;
use super::descriptor::{ActionOutcome, OperationDescriptor};
use super::errors::RunnerResult;
use super::report::{ExecutionReport, RecordFailure, RollbackReport};
use super::rollback::{generate_operation_id, OperationOutcome, RollbackLog};
use super::snapshot::Snapshot;

/// Runs destructive operations against a data store
pub struct OperationRunner<'a> {
    store: &'a dyn DataStore,
    rollback_log: &'a RollbackLog,
}

impl<'a> OperationRunner<'a> {
    /// Creates a runner over the given store and rollback log
    pub fn new(store: &'a dyn DataStore, rollback_log: &'a RollbackLog) -> Self {
        Self {
            store,
            rollback_log,
        }
    }

    /// Executes one destructive operation.
    ///
    /// An unreachable store fails before any read or write. An empty
    /// match, a dry run, and a declined confirmation all return a
    /// zero-change report without touching the store or the rollback
    /// log. Otherwise the snapshot is durable in the rollback log
    /// before the first mutation, each record commits atomically, and
    /// one record's failure is recorded without stopping the rest.
    pub fn run(
        &self,
        descriptor: &OperationDescriptor,
        dry_run: bool,
        confirm: &dyn ConfirmationGate,
    ) -> RunnerResult<ExecutionReport> {
        let started_at = Utc::now();

        self.store.ping()?;

        let matched = self.store.query(descriptor.target())?;
        let snapshot = Snapshot::capture(
            descriptor.name(),
            &descriptor.target().collection,
            descriptor.reversible(),
            &matched,
        );

        let report = |operation_id: Option<String>,
                      records_changed: usize,
                      errors: Vec<RecordFailure>,
                      aborted: bool| ExecutionReport {
            operation_id,
            operation: descriptor.name().to_string(),
            records_matched: matched.len(),
            records_changed,
            errors,
            aborted,
            dry_run,
            reversible: descriptor.reversible(),
            started_at,
            finished_at: Utc::now(),
        };

        // Nothing matched: zero-change report, nothing to confirm
        if matched.is_empty() {
            return Ok(report(None, 0, Vec::new(), false));
        }

        // Dry run: evaluate actions so the operator sees what would
        // change and which records would fail, but write nothing
        if dry_run {
            let errors = matched
                .iter()
                .filter_map(|record| {
                    descriptor
                        .apply(record)
                        .err()
                        .map(|e| RecordFailure::new(&record.id, e.to_string()))
                })
                .collect();
            return Ok(report(None, 0, errors, false));
        }

        if !confirm.confirm(descriptor.name(), matched.len()) {
            return Ok(report(None, 0, Vec::new(), true));
        }

        // The snapshot must be durable before the first mutation;
        // failing here aborts with zero changes
        let operation_id = generate_operation_id();
        self.rollback_log.persist(&operation_id, &snapshot)?;

        let mut changed_ids = Vec::new();
        let mut errors = Vec::new();

        for record in &matched {
            match descriptor.apply(record) {
                Ok(ActionOutcome::Mutate(body)) => {
                    let mutated = StoredRecord::new(&record.collection, &record.id, body);
                    match self.store.update(&mutated) {
                        Ok(()) => changed_ids.push(record.id.clone()),
                        Err(e) => errors.push(RecordFailure::new(&record.id, e.to_string())),
                    }
                }
                Ok(ActionOutcome::Delete) => {
                    match self.store.delete(&record.collection, &record.id) {
                        Ok(()) => changed_ids.push(record.id.clone()),
                        Err(e) => errors.push(RecordFailure::new(&record.id, e.to_string())),
                    }
                }
                Ok(ActionOutcome::Keep) => {}
                Err(e) => errors.push(RecordFailure::new(&record.id, e.to_string())),
            }
        }

        self.rollback_log.record_outcome(&OperationOutcome {
            operation_id: operation_id.clone(),
            changed_ids: changed_ids.clone(),
            errors: errors.clone(),
            finished_at: Utc::now(),
        })?;

        Ok(report(Some(operation_id), changed_ids.len(), errors, false))
    }

    /// Replays a recorded snapshot to restore prior state.
    ///
    /// Only records the outcome file lists as changed are restored;
    /// when the outcome file is missing (process died mid-application)
    /// every pre-image is replayed. Each restore commits atomically
    /// per record.
    pub fn rollback(
        &self,
        operation_id: &str,
        confirm: &dyn ConfirmationGate,
    ) -> RunnerResult<RollbackReport> {
        let started_at = Utc::now();

        self.store.ping()?;

        let (snapshot, outcome) = self.rollback_log.load(operation_id)?;

        let changed: Option<HashSet<&str>> = outcome
            .as_ref()
            .map(|o| o.changed_ids.iter().map(String::as_str).collect());

        let targets: Vec<_> = snapshot
            .records
            .iter()
            .filter(|r| match &changed {
                Some(ids) => ids.contains(r.id.as_str()),
                None => true,
            })
            .collect();

        let prompt = format!("rollback of {}", operation_id);
        if !confirm.confirm(&prompt, targets.len()) {
            return Ok(RollbackReport {
                operation_id: operation_id.to_string(),
                records_in_snapshot: snapshot.len(),
                records_restored: 0,
                errors: Vec::new(),
                aborted: true,
                started_at,
                finished_at: Utc::now(),
            });
        }

        let mut restored = 0;
        let mut errors = Vec::new();

        for pre_image in targets {
            let record =
                StoredRecord::new(&snapshot.collection, &pre_image.id, pre_image.body.clone());

            let result = match self.store.get(&snapshot.collection, &pre_image.id) {
                Ok(Some(_)) => self.store.update(&record),
                Ok(None) => self.store.insert(&record),
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => restored += 1,
                Err(e) => errors.push(RecordFailure::new(&pre_image.id, e.to_string())),
            }
        }

        Ok(RollbackReport {
            operation_id: operation_id.to_string(),
            records_in_snapshot: snapshot.len(),
            records_restored: restored,
            errors,
            aborted: false,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
