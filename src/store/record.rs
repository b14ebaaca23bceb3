//! The unit of storage: one JSON document in a named collection

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record as read from or written to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Collection the record lives in
    pub collection: String,
    /// Record id (unique within the collection)
    pub id: String,
    /// Document body
    pub body: Value,
}

impl StoredRecord {
    /// Creates a record
    pub fn new(collection: impl Into<String>, id: impl Into<String>, body: Value) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            body,
        }
    }

    /// Returns a string field from the body, if present and a string
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.body.get(field).and_then(Value::as_str)
    }

    /// Returns a bool field from the body, if present and a bool
    pub fn bool_field(&self, field: &str) -> Option<bool> {
        self.body.get(field).and_then(Value::as_bool)
    }
}
