//! Observability for operator commands
//!
//! Two surfaces:
//! - `Logger`: structured one-line JSON events on stderr (stdout is
//!   reserved for command responses)
//! - the ops log: an append-only, fsynced record of every command
//!   attempt and outcome

mod audit;
mod logger;

pub use audit::{FileOpsLog, MemoryOpsLog, OpsAction, OpsLog, OpsOutcome, OpsRecord};
pub use logger::{Logger, Severity};
