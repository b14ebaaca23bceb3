//! Pre-change snapshots
//!
//! A snapshot is the ordered sequence of pre-change record bodies
//! matched by the target query, captured before any mutation. Its
//! checksum covers the canonical JSON of the records, so a tampered or
//! truncated rollback-log entry is detected before a restore replays
//! it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::StoredRecord;

/// Pre-image of one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Record id
    pub id: String,
    /// Body before the operation
    pub body: Value,
}

/// Pre-change copy of every record an operation matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Operation name
    pub operation: String,
    /// Collection the records live in
    pub collection: String,
    /// Whether the operation declared itself reversible
    pub reversible: bool,
    /// When the snapshot was captured
    pub created_at: DateTime<Utc>,
    /// Pre-images, in query order
    pub records: Vec<SnapshotRecord>,
}

impl Snapshot {
    /// Captures pre-images of the matched records
    pub fn capture(
        operation: impl Into<String>,
        collection: impl Into<String>,
        reversible: bool,
        matched: &[StoredRecord],
    ) -> Self {
        Self {
            operation: operation.into(),
            collection: collection.into(),
            reversible,
            created_at: Utc::now(),
            records: matched
                .iter()
                .map(|r| SnapshotRecord {
                    id: r.id.clone(),
                    body: r.body.clone(),
                })
                .collect(),
        }
    }

    /// Number of pre-images held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing was matched
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pre-image body for one record id
    pub fn pre_image(&self, id: &str) -> Option<&Value> {
        self.records.iter().find(|r| r.id == id).map(|r| &r.body)
    }

    /// CRC32 over the canonical JSON of the pre-images.
    ///
    /// serde_json orders object keys deterministically, so the same
    /// records always produce the same checksum.
    pub fn checksum(&self) -> u32 {
        let bytes = serde_json::to_vec(&self.records).unwrap_or_default();
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&bytes);
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<StoredRecord> {
        vec![
            StoredRecord::new("users", "a", json!({"v": 1})),
            StoredRecord::new("users", "b", json!({"v": 2})),
        ]
    }

    #[test]
    fn test_capture_preserves_order_and_bodies() {
        let snapshot = Snapshot::capture("deactivate", "users", true, &records());

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.records[0].id, "a");
        assert_eq!(snapshot.pre_image("b"), Some(&json!({"v": 2})));
        assert_eq!(snapshot.pre_image("missing"), None);
    }

    #[test]
    fn test_checksum_is_stable_across_roundtrip() {
        let snapshot = Snapshot::capture("deactivate", "users", true, &records());

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot.checksum(), parsed.checksum());
        assert_eq!(snapshot, parsed);
    }

    #[test]
    fn test_checksum_detects_changed_pre_image() {
        let snapshot = Snapshot::capture("deactivate", "users", true, &records());
        let mut tampered = snapshot.clone();
        tampered.records[0].body = json!({"v": 999});

        assert_ne!(snapshot.checksum(), tampered.checksum());
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::capture("noop", "users", true, &[]);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.len(), 0);
    }
}
