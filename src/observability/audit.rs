//! Operator ops log
//!
//! Every destructive command attempt and its outcome are recorded:
//! what was requested, whether the operator confirmed, what executed,
//! what failed, what was rolled back. The log is append-only, one
//! JSON record per line, synced to disk before the append returns,
//! so it survives the process and can be reviewed after the fact.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpsAction {
    /// A destructive command was requested
    OperationRequested,
    /// The operator declined the confirmation gate
    ConfirmationRejected,
    /// The operation ran to completion (possibly with per-record
    /// failures; see the execution report)
    OperationExecuted,
    /// The operation aborted with a fatal error
    OperationFailed,
    /// A recorded operation was rolled back
    OperationRolledBack,
}

/// How it ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpsOutcome {
    /// Action succeeded
    Success,
    /// Action was rejected by the operator
    Rejected,
    /// Action failed
    Failed,
    /// Action is in flight (request records)
    Pending,
}

/// A single ops-log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsRecord {
    /// Unique record id
    pub id: Uuid,

    /// When the action occurred
    pub ts: DateTime<Utc>,

    /// The action
    pub action: OpsAction,

    /// Outcome of the action
    pub outcome: OpsOutcome,

    /// Operation name, if applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// Rollback-log operation id, if one was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,

    /// Records matched / affected, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,

    /// Error message for failed actions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OpsRecord {
    /// Creates a record
    pub fn new(action: OpsAction, outcome: OpsOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            ts: Utc::now(),
            action,
            outcome,
            operation: None,
            operation_id: None,
            records: None,
            error: None,
        }
    }

    /// Sets the operation name
    pub fn with_operation(mut self, name: impl Into<String>) -> Self {
        self.operation = Some(name.into());
        self
    }

    /// Sets the rollback-log operation id
    pub fn with_operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    /// Sets the affected-record count
    pub fn with_records(mut self, records: usize) -> Self {
        self.records = Some(records);
        self
    }

    /// Sets the error message
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// Append-only ops log.
///
/// Appends MUST be durable before they return; a crash right after an
/// append never loses the record.
pub trait OpsLog {
    /// Append a record
    fn append(&self, record: &OpsRecord) -> io::Result<()>;
}

/// File-backed ops log: one JSON record per line, fsync per append
pub struct FileOpsLog {
    path: PathBuf,
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl FileOpsLog {
    /// Opens or creates the log file
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    /// Log file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OpsLog for FileOpsLog {
    fn append(&self, record: &OpsRecord) -> io::Result<()> {
        let json = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "ops log lock poisoned"))?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }
}

/// In-memory ops log for tests
#[derive(Debug, Default)]
pub struct MemoryOpsLog {
    records: Arc<Mutex<Vec<OpsRecord>>>,
}

impl MemoryOpsLog {
    /// Creates an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entries
    pub fn records(&self) -> Vec<OpsRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// True when nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

impl OpsLog for MemoryOpsLog {
    fn append(&self, record: &OpsRecord) -> io::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
