//! Destructive-operation runner
//!
//! Every repair and cleanup command goes through one code path:
//!
//! 1. Fail fast if the store is unreachable (nothing has been written)
//! 2. Resolve the target query and capture matched records as a
//!    Snapshot
//! 3. Zero matches or `--dry-run`: report, write nothing
//! 4. Invoke the confirmation gate exactly once, with the match count
//! 5. Persist the Snapshot to the rollback log, fsynced, before the
//!    first mutation
//! 6. Apply the action per record; each record commits atomically and
//!    one record's failure never stops the others
//! 7. Record which records actually changed
//! 8. Return an Execution Report carrying the operation id
//!
//! `rollback <operation-id>` replays the Snapshot's pre-images to
//! restore prior state.

mod confirm;
mod descriptor;
mod errors;
mod report;
mod rollback;
mod runner;
mod snapshot;

pub use confirm::{AssumeYes, ConfirmationGate, StaticGate, StdinConfirmation};
pub use descriptor::{ActionError, ActionOutcome, OperationDescriptor};
pub use errors::{RunnerError, RunnerResult};
pub use report::{ExecutionReport, RecordFailure, RollbackReport};
pub use rollback::{generate_operation_id, OperationOutcome, RollbackEntrySummary, RollbackLog};
pub use runner::OperationRunner;
pub use snapshot::{Snapshot, SnapshotRecord};
