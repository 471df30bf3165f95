//! Credential store abstraction for authgate.
//!
//! The persistence layer is an external collaborator consumed through a
//! narrow trait: select one record by an equality filter, update fields on a
//! record addressed by its primary key. Any backend (SQL, key-value, remote
//! service) can implement it; `MemoryStore` ships as a reference
//! implementation for tests and embedders without a database.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;

use crate::record::Record;

/// Equality filter: every listed field must match exactly.
pub type Filter = BTreeMap<String, Value>;

/// Credential store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The named table does not exist in this store.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Trait for credential record lookup and update.
///
/// Implementations must treat `update` as a partial write: only the listed
/// fields change, addressed by `key_field == key`. `select` returns at most
/// one record; which record wins on multiple matches is backend-defined, so
/// callers filter on unique columns.
pub trait RecordStore {
    /// Select one record matching every field of `filter`, or `None`.
    fn select(&self, table: &str, filter: &Filter) -> Result<Option<Record>, StoreError>;

    /// Update fields on the record whose `key_field` equals `key`.
    ///
    /// Returns `true` if a record was updated, `false` if none matched.
    fn update(
        &self,
        table: &str,
        key_field: &str,
        key: &Value,
        fields: &Record,
    ) -> Result<bool, StoreError>;
}

/// In-memory credential store.
///
/// Tables are plain record lists behind a mutex; lookups are linear scans.
/// A table nothing has written to reads as empty rather than erroring.
/// Intended for tests and small embedded deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, Vec<Record>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record into a table, creating the table if needed.
    pub fn insert(&self, table: &str, record: Record) {
        let mut tables = self.tables.lock().unwrap();
        tables.entry(table.to_string()).or_default().push(record);
    }
}

impl RecordStore for MemoryStore {
    fn select(&self, table: &str, filter: &Filter) -> Result<Option<Record>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|r| r.matches(filter)).cloned()))
    }

    fn update(
        &self,
        table: &str,
        key_field: &str,
        key: &Value,
        fields: &Record,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(false);
        };
        let mut updated = false;
        for row in rows.iter_mut() {
            if row.get(key_field) == Some(key) {
                row.apply(fields);
                updated = true;
            }
        }
        Ok(updated)
    }
}
