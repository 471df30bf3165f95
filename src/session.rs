//! Session storage for authgate.
//!
//! One process may host several independent authentication contexts (for
//! example an admin area and a customer area), each identified by a numeric
//! namespace. The session store keeps the currently authenticated record per
//! namespace. Entries are replaced whole or removed, never partially
//! written, so a reader can never observe a half-updated record.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::record::Record;

/// Integer identifying one independent login slot.
pub type AuthNamespace = u32;

/// Process-wide keyed storage for the authenticated record per namespace.
///
/// Shared between engines via `Arc`. Locking is coarse; only the single
/// in-flight request for one client mutates its entry, so contention is not
/// a concern here.
#[derive(Debug, Default)]
pub struct SessionStore {
    entries: Mutex<HashMap<AuthNamespace, Record>>,
}

impl SessionStore {
    /// Create an empty session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the record for a namespace, if one is set.
    pub fn get(&self, namespace: AuthNamespace) -> Option<Record> {
        self.entries.lock().unwrap().get(&namespace).cloned()
    }

    /// True if the namespace has an authenticated record.
    pub fn contains(&self, namespace: AuthNamespace) -> bool {
        self.entries.lock().unwrap().contains_key(&namespace)
    }

    /// Set the record for a namespace, replacing any prior entry whole.
    pub fn set(&self, namespace: AuthNamespace, record: Record) {
        self.entries.lock().unwrap().insert(namespace, record);
    }

    /// Remove the record for a namespace. Always succeeds.
    pub fn remove(&self, namespace: AuthNamespace) {
        self.entries.lock().unwrap().remove(&namespace);
    }
}
