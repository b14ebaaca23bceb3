//! Append-only rollback log
//!
//! One directory per operation under the rollback root:
//!
//! ```text
//! rollback/
//!   op-20260807T120000Z-3f9a2c1e/
//!     snapshot.json   pre-images + checksum, fsynced BEFORE mutation
//!     outcome.json    ids actually changed, written after application
//! ```
//!
//! Entries are never rewritten. A missing outcome.json means the
//! process died mid-application; a restore then replays every
//! pre-image instead of just the changed ones.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{RunnerError, RunnerResult};
use super::report::RecordFailure;
use super::snapshot::Snapshot;

const SNAPSHOT_FILE: &str = "snapshot.json";
const OUTCOME_FILE: &str = "outcome.json";

/// Generates an operation identifier: a UTC timestamp in basic format
/// plus a random suffix so two operations within one second cannot
/// collide.
pub fn generate_operation_id() -> String {
    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("op-{}-{}", stamp, &suffix[..8])
}

/// On-disk form of a snapshot entry
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    checksum: u32,
    snapshot: Snapshot,
}

/// What an operation actually changed, written after application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// The operation this outcome belongs to
    pub operation_id: String,
    /// Ids whose mutation committed, in processing order
    pub changed_ids: Vec<String>,
    /// Per-record failures
    pub errors: Vec<RecordFailure>,
    /// When application finished
    pub finished_at: DateTime<Utc>,
}

/// One line of `adminctl operations` output
#[derive(Debug, Clone, Serialize)]
pub struct RollbackEntrySummary {
    /// Operation id (pass to `rollback --operation`)
    pub operation_id: String,
    /// Operation name
    pub operation: String,
    /// Collection the snapshot covers
    pub collection: String,
    /// Pre-images held
    pub records: usize,
    /// Whether the operation declared itself reversible
    pub reversible: bool,
    /// When the snapshot was captured
    pub created_at: DateTime<Utc>,
    /// False when the process died before recording an outcome
    pub completed: bool,
    /// Records the operation changed, when known
    pub records_changed: Option<usize>,
}

/// The rollback log
pub struct RollbackLog {
    root: PathBuf,
}

impl RollbackLog {
    /// Opens the log rooted at `root`, creating the directory if
    /// needed.
    pub fn open(root: impl AsRef<Path>) -> RunnerResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| RunnerError::rollback_log(&root, e.to_string()))?;
        Ok(Self { root })
    }

    /// Log root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, operation_id: &str) -> PathBuf {
        self.root.join(operation_id)
    }

    /// Persists a snapshot under the given operation id.
    ///
    /// The entry is fsynced (file, entry directory, and log root)
    /// before this returns; the caller may only start mutating records
    /// afterwards. Fails if the id already has an entry; the log is
    /// append-only.
    pub fn persist(&self, operation_id: &str, snapshot: &Snapshot) -> RunnerResult<()> {
        let dir = self.entry_dir(operation_id);
        if dir.exists() {
            return Err(RunnerError::rollback_log(
                &dir,
                "entry already exists; rollback log is append-only",
            ));
        }

        fs::create_dir_all(&dir).map_err(|e| RunnerError::rollback_log(&dir, e.to_string()))?;

        let file = SnapshotFile {
            checksum: snapshot.checksum(),
            snapshot: snapshot.clone(),
        };

        let result = write_json_with_fsync(&dir.join(SNAPSHOT_FILE), &file)
            .and_then(|_| fsync_dir(&dir))
            .and_then(|_| fsync_dir(&self.root));

        // A partial entry must not survive; it would shadow the id
        if result.is_err() {
            let _ = fs::remove_dir_all(&dir);
        }

        result
    }

    /// Records what the operation actually changed
    pub fn record_outcome(&self, outcome: &OperationOutcome) -> RunnerResult<()> {
        let dir = self.entry_dir(&outcome.operation_id);
        if !dir.is_dir() {
            return Err(RunnerError::UnknownOperation(outcome.operation_id.clone()));
        }

        write_json_with_fsync(&dir.join(OUTCOME_FILE), outcome).and_then(|_| fsync_dir(&dir))
    }

    /// Loads an entry: the snapshot (checksum-verified) and, when
    /// application finished, its outcome.
    pub fn load(&self, operation_id: &str) -> RunnerResult<(Snapshot, Option<OperationOutcome>)> {
        let dir = self.entry_dir(operation_id);
        if !dir.is_dir() {
            return Err(RunnerError::UnknownOperation(operation_id.to_string()));
        }

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let file: SnapshotFile = read_json(&snapshot_path)?;

        if file.snapshot.checksum() != file.checksum {
            return Err(RunnerError::rollback_log(
                &snapshot_path,
                "snapshot checksum mismatch",
            ));
        }

        let outcome_path = dir.join(OUTCOME_FILE);
        let outcome = if outcome_path.is_file() {
            Some(read_json(&outcome_path)?)
        } else {
            None
        };

        Ok((file.snapshot, outcome))
    }

    /// Lists every recorded operation, oldest first
    pub fn list(&self) -> RunnerResult<Vec<RollbackEntrySummary>> {
        let entries =
            fs::read_dir(&self.root).map_err(|e| RunnerError::rollback_log(&self.root, e.to_string()))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| RunnerError::rollback_log(&self.root, e.to_string()))?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();

        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            let (snapshot, outcome) = self.load(&id)?;
            summaries.push(RollbackEntrySummary {
                operation_id: id,
                operation: snapshot.operation.clone(),
                collection: snapshot.collection.clone(),
                records: snapshot.len(),
                reversible: snapshot.reversible,
                created_at: snapshot.created_at,
                completed: outcome.is_some(),
                records_changed: outcome.map(|o| o.changed_ids.len()),
            });
        }

        Ok(summaries)
    }
}

/// Serialize to a file and fsync it
fn write_json_with_fsync<T: Serialize>(path: &Path, value: &T) -> RunnerResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| RunnerError::rollback_log(path, e.to_string()))?;

    let mut file =
        File::create(path).map_err(|e| RunnerError::rollback_log(path, e.to_string()))?;
    file.write_all(json.as_bytes())
        .map_err(|e| RunnerError::rollback_log(path, e.to_string()))?;
    file.sync_all()
        .map_err(|e| RunnerError::rollback_log(path, e.to_string()))
}

/// Read and parse a JSON file
fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> RunnerResult<T> {
    let contents =
        fs::read_to_string(path).map_err(|e| RunnerError::rollback_log(path, e.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| RunnerError::rollback_log(path, e.to_string()))
}

/// fsync a directory
fn fsync_dir(path: &Path) -> RunnerResult<()> {
    let dir = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| RunnerError::rollback_log(path, e.to_string()))?;
    dir.sync_all()
        .map_err(|e| RunnerError::rollback_log(path, e.to_string()))
}
