//! Execution reports
//!
//! One report per invocation, produced after the operation finishes and
//! never mutated afterwards. Operators inspect `errors` for partial
//! failures; a populated `errors` list does not make the exit code
//! non-zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One record the operation failed on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    /// Record id the failure applies to
    pub record_id: String,
    /// Failure reason
    pub reason: String,
}

impl RecordFailure {
    /// Creates a failure entry
    pub fn new(record_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            reason: reason.into(),
        }
    }
}

/// Summary of what one destructive operation matched, changed, and
/// failed on
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    /// Rollback-log identifier; absent when nothing was written
    /// (empty match, dry run, or operator abort)
    pub operation_id: Option<String>,

    /// Operation name
    pub operation: String,

    /// Records matched by the target query at snapshot time
    pub records_matched: usize,

    /// Records whose mutation committed. Always <= records_matched.
    pub records_changed: usize,

    /// Per-record failures, in processing order
    pub errors: Vec<RecordFailure>,

    /// True when the confirmation gate declined
    pub aborted: bool,

    /// True when the run was a dry run
    pub dry_run: bool,

    /// Whether a rollback restores prior state exactly
    pub reversible: bool,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl ExecutionReport {
    /// True when some records were left unchanged by failures
    pub fn is_partial_failure(&self) -> bool {
        !self.errors.is_empty() && self.records_changed > 0
    }
}

/// Summary of a snapshot replay
#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    /// The operation that was rolled back
    pub operation_id: String,

    /// Pre-images held by the snapshot
    pub records_in_snapshot: usize,

    /// Records restored to their pre-image
    pub records_restored: usize,

    /// Per-record restore failures
    pub errors: Vec<RecordFailure>,

    /// True when the confirmation gate declined
    pub aborted: bool,

    /// When the replay started
    pub started_at: DateTime<Utc>,

    /// When the replay finished
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(matched: usize, changed: usize, errors: Vec<RecordFailure>) -> ExecutionReport {
        let now = Utc::now();
        ExecutionReport {
            operation_id: Some("op-test".to_string()),
            operation: "test".to_string(),
            records_matched: matched,
            records_changed: changed,
            errors,
            aborted: false,
            dry_run: false,
            reversible: true,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_partial_failure_detection() {
        assert!(report(10, 9, vec![RecordFailure::new("id_5", "boom")]).is_partial_failure());
        assert!(!report(10, 10, vec![]).is_partial_failure());
        assert!(!report(0, 0, vec![]).is_partial_failure());
    }

    #[test]
    fn test_report_serializes_errors() {
        let json = serde_json::to_value(report(2, 1, vec![RecordFailure::new("u1", "bad")]))
            .unwrap();

        assert_eq!(json["records_matched"], 2);
        assert_eq!(json["errors"][0]["record_id"], "u1");
    }
}
