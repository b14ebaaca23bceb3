//! In-memory data store for tests
//!
//! Mirrors the file store's semantics, plus a switchable "unreachable"
//! flag so tests can exercise connection failures deterministically.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use serde_json::Value;

use crate::query::TargetQuery;

use super::errors::{StoreError, StoreResult};
use super::record::StoredRecord;
use super::DataStore;

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    unreachable: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with a connection error
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|_| StoreError::Connection("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|_| StoreError::Connection("lock poisoned".to_string()))
    }
}

impl DataStore for MemoryStore {
    fn ping(&self) -> StoreResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(StoreError::Connection("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }

    fn collections(&self) -> StoreResult<Vec<String>> {
        self.ping()?;
        Ok(self.read()?.keys().cloned().collect())
    }

    fn query(&self, target: &TargetQuery) -> StoreResult<Vec<StoredRecord>> {
        self.ping()?;

        let collections = self.read()?;
        let records = match collections.get(&target.collection) {
            Some(records) => records,
            None => return Ok(Vec::new()),
        };

        Ok(records
            .iter()
            .filter(|(_, body)| target.matches(body))
            .map(|(id, body)| StoredRecord::new(&target.collection, id.clone(), body.clone()))
            .collect())
    }

    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<StoredRecord>> {
        self.ping()?;

        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .and_then(|records| records.get(id))
            .map(|body| StoredRecord::new(collection, id, body.clone())))
    }

    fn insert(&self, record: &StoredRecord) -> StoreResult<()> {
        self.ping()?;

        let mut collections = self.write()?;
        let records = collections.entry(record.collection.clone()).or_default();

        if records.contains_key(&record.id) {
            return Err(StoreError::already_exists(&record.collection, &record.id));
        }

        records.insert(record.id.clone(), record.body.clone());
        Ok(())
    }

    fn update(&self, record: &StoredRecord) -> StoreResult<()> {
        self.ping()?;

        let mut collections = self.write()?;
        let records = collections
            .get_mut(&record.collection)
            .ok_or_else(|| StoreError::not_found(&record.collection, &record.id))?;

        if !records.contains_key(&record.id) {
            return Err(StoreError::not_found(&record.collection, &record.id));
        }

        records.insert(record.id.clone(), record.body.clone());
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.ping()?;

        let mut collections = self.write()?;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        if records.remove(id).is_none() {
            return Err(StoreError::not_found(collection, id));
        }

        Ok(())
    }
}
