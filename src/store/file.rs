//! File-backed data store
//!
//! One JSON file per collection under `<data_dir>/data/`, each holding
//! an object mapping record id to document body. Writes go through a
//! temp file, fsync, and rename, so a record mutation is visible either
//! completely or not at all. Parse failures are explicit errors; a
//! corrupt collection is never silently skipped.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::query::TargetQuery;

use super::errors::{StoreError, StoreResult};
use super::record::StoredRecord;
use super::DataStore;

/// JSON-collection-file store
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `data_dir`.
    ///
    /// Fails with `Connection` when the data directory is missing,
    /// which is also what `ping` reports for the lifetime of the
    /// handle.
    pub fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let store = Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        };
        store.ping()?;
        Ok(store)
    }

    /// Directory holding the collection files
    fn collections_dir(&self) -> PathBuf {
        self.data_dir.join("data")
    }

    /// Path of one collection file
    fn collection_path(&self, collection: &str) -> StoreResult<PathBuf> {
        validate_collection_name(collection)?;
        Ok(self.collections_dir().join(format!("{}.json", collection)))
    }

    /// Loads a collection into an id-ordered map. A missing file is an
    /// empty collection.
    fn load(&self, collection: &str) -> StoreResult<BTreeMap<String, Value>> {
        let path = self.collection_path(collection)?;

        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents =
            fs::read_to_string(&path).map_err(|e| StoreError::io_at(&path, e))?;

        serde_json::from_str(&contents)
            .map_err(|e| StoreError::corrupt(collection, e.to_string()))
    }

    /// Writes a collection atomically: temp file, fsync, rename, then
    /// fsync of the containing directory.
    fn commit(&self, collection: &str, records: &BTreeMap<String, Value>) -> StoreResult<()> {
        let path = self.collection_path(collection)?;
        let tmp_path = self.collections_dir().join(format!("{}.json.tmp", collection));

        let json = serde_json::to_string_pretty(records)?;

        let mut tmp = File::create(&tmp_path).map_err(|e| StoreError::io_at(&tmp_path, e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| StoreError::io_at(&tmp_path, e))?;
        tmp.sync_all().map_err(|e| StoreError::io_at(&tmp_path, e))?;

        fs::rename(&tmp_path, &path).map_err(|e| StoreError::io_at(&path, e))?;

        fsync_dir(&self.collections_dir())
    }
}

impl DataStore for FileStore {
    fn ping(&self) -> StoreResult<()> {
        let dir = self.collections_dir();
        if dir.is_dir() {
            Ok(())
        } else {
            Err(StoreError::Connection(format!(
                "data directory missing: {}",
                dir.display()
            )))
        }
    }

    fn collections(&self) -> StoreResult<Vec<String>> {
        self.ping()?;

        let dir = self.collections_dir();
        let entries = fs::read_dir(&dir).map_err(|e| StoreError::io_at(&dir, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io_at(&dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    fn query(&self, target: &TargetQuery) -> StoreResult<Vec<StoredRecord>> {
        self.ping()?;

        let records = self.load(&target.collection)?;

        Ok(records
            .into_iter()
            .filter(|(_, body)| target.matches(body))
            .map(|(id, body)| StoredRecord::new(&target.collection, id, body))
            .collect())
    }

    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<StoredRecord>> {
        self.ping()?;

        let records = self.load(collection)?;
        Ok(records
            .get(id)
            .map(|body| StoredRecord::new(collection, id, body.clone())))
    }

    fn insert(&self, record: &StoredRecord) -> StoreResult<()> {
        self.ping()?;

        let mut records = self.load(&record.collection)?;
        if records.contains_key(&record.id) {
            return Err(StoreError::already_exists(&record.collection, &record.id));
        }

        records.insert(record.id.clone(), record.body.clone());
        self.commit(&record.collection, &records)
    }

    fn update(&self, record: &StoredRecord) -> StoreResult<()> {
        self.ping()?;

        let mut records = self.load(&record.collection)?;
        if !records.contains_key(&record.id) {
            return Err(StoreError::not_found(&record.collection, &record.id));
        }

        records.insert(record.id.clone(), record.body.clone());
        self.commit(&record.collection, &records)
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.ping()?;

        let mut records = self.load(collection)?;
        if records.remove(id).is_none() {
            return Err(StoreError::not_found(collection, id));
        }

        self.commit(collection, &records)
    }
}

/// Collection names come from code, but guard against anything that
/// could escape the data directory.
fn validate_collection_name(collection: &str) -> StoreResult<()> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::corrupt(collection, "invalid collection name"))
    }
}

/// fsync a directory to ensure durability of a rename.
fn fsync_dir(path: &Path) -> StoreResult<()> {
    let dir = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| StoreError::io_at(path, e))?;

    dir.sync_all().map_err(|e| StoreError::io_at(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FilterOp;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_store(temp_dir: &TempDir) -> FileStore {
        fs::create_dir_all(temp_dir.path().join("data")).unwrap();
        FileStore::open(temp_dir.path()).unwrap()
    }

    #[test]
    fn test_open_requires_data_dir() {
        let temp_dir = TempDir::new().unwrap();

        let result = FileStore::open(temp_dir.path().join("nowhere"));
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }

    #[test]
    fn test_insert_get_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        let record = StoredRecord::new("users", "u1", json!({"phone": "111"}));
        store.insert(&record).unwrap();

        let found = store.get("users", "u1").unwrap().unwrap();
        assert_eq!(found.body, json!({"phone": "111"}));
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        let record = StoredRecord::new("users", "u1", json!({}));
        store.insert(&record).unwrap();

        let result = store.insert(&record);
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
    }

    #[test]
    fn test_update_requires_existing_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        let record = StoredRecord::new("users", "ghost", json!({}));
        let result = store.update(&record);
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_delete_removes_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store
            .insert(&StoredRecord::new("users", "u1", json!({})))
            .unwrap();
        store.delete("users", "u1").unwrap();

        assert!(store.get("users", "u1").unwrap().is_none());
        assert!(matches!(
            store.delete("users", "u1"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_query_filters_and_orders_by_id() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store
            .insert(&StoredRecord::new("users", "b", json!({"role": "STAFF"})))
            .unwrap();
        store
            .insert(&StoredRecord::new("users", "a", json!({"role": "STAFF"})))
            .unwrap();
        store
            .insert(&StoredRecord::new("users", "c", json!({"role": "CUSTOMER"})))
            .unwrap();

        let target = TargetQuery::all("users").with("role", FilterOp::Eq(json!("STAFF")));
        let matched = store.query(&target).unwrap();

        let ids: Vec<&str> = matched.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_query_missing_collection_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        let matched = store.query(&TargetQuery::all("nothing_here")).unwrap();
        assert!(matched.is_empty());
    }

    #[test]
    fn test_corrupt_collection_fails_explicitly() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        fs::write(temp_dir.path().join("data/users.json"), "not valid json").unwrap();

        let result = store.query(&TargetQuery::all("users"));
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = open_store(&temp_dir);
            store
                .insert(&StoredRecord::new("users", "u1", json!({"phone": "111"})))
                .unwrap();
        }

        let store = FileStore::open(temp_dir.path()).unwrap();
        let found = store.get("users", "u1").unwrap().unwrap();
        assert_eq!(found.str_field("phone"), Some("111"));
    }

    #[test]
    fn test_failed_write_leaves_record_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store
            .insert(&StoredRecord::new("users", "u1", json!({"v": 1})))
            .unwrap();

        // A rejected update must not change the stored body
        let result = store.update(&StoredRecord::new("users", "ghost", json!({"v": 2})));
        assert!(result.is_err());

        let found = store.get("users", "u1").unwrap().unwrap();
        assert_eq!(found.body, json!({"v": 1}));
    }

    #[test]
    fn test_invalid_collection_name_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        let result = store.get("../escape", "u1");
        assert!(result.is_err());
    }

    #[test]
    fn test_collections_lists_sorted_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store
            .insert(&StoredRecord::new("users", "u1", json!({})))
            .unwrap();
        store
            .insert(&StoredRecord::new("otps", "o1", json!({})))
            .unwrap();

        assert_eq!(store.collections().unwrap(), vec!["otps", "users"]);
    }
}
