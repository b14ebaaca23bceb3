//! Data-access layer for the application's backend store
//!
//! The store holds named collections of JSON documents keyed by string
//! id. Every write commits atomically for exactly one record: a failed
//! insert/update/delete leaves that record untouched, and never affects
//! any other record. This per-record transaction boundary is what the
//! destructive-operation runner relies on.
//!
//! Two implementations:
//! - `FileStore`: one JSON file per collection under `<data_dir>/data/`,
//!   written with temp-file + fsync + rename
//! - `MemoryStore`: in-memory, for tests, with a switchable
//!   "unreachable" flag to exercise connection failures

mod errors;
mod file;
mod memory;
mod record;

pub use errors::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::StoredRecord;

use crate::query::TargetQuery;

/// Data-access operations the admin tooling needs.
///
/// Reads return records in deterministic id order. Writes are atomic
/// per record (begin/commit around one record's mutation); there is no
/// multi-record transaction.
pub trait DataStore {
    /// Connectivity check.
    ///
    /// Fails with `StoreError::Connection` when the store is
    /// unreachable. Callers performing destructive work MUST ping
    /// before reading so that an unreachable store aborts fatally
    /// before any mutation is attempted.
    fn ping(&self) -> StoreResult<()>;

    /// Lists collection names present in the store, sorted.
    fn collections(&self) -> StoreResult<Vec<String>>;

    /// Returns all records matching the target query, in id order.
    fn query(&self, target: &TargetQuery) -> StoreResult<Vec<StoredRecord>>;

    /// Fetches one record, or `None` if it does not exist.
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<StoredRecord>>;

    /// Inserts a new record. Fails with `AlreadyExists` if the id is
    /// taken.
    fn insert(&self, record: &StoredRecord) -> StoreResult<()>;

    /// Replaces the body of an existing record. Fails with `NotFound`
    /// if the record does not exist.
    fn update(&self, record: &StoredRecord) -> StoreResult<()>;

    /// Deletes a record. Fails with `NotFound` if it does not exist.
    fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
}
