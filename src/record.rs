//! User record model for authgate.
//!
//! A record is an opaque field-name → value mapping fetched from the
//! credential store. The engine never assumes a schema beyond the field
//! names it is configured with, so the representation stays generic.

use std::collections::BTreeMap;

use serde_json::Value;

/// A credential-store row: ordered mapping from field name to value.
///
/// Records are transient. They are read from the store, held in the session
/// entry for at most one authenticated session, and mutated only through
/// explicit store updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a field as a string slice, if it is a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Set a field value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// True if the field is missing, null, or an empty string.
    ///
    /// Used for the legacy-password column: a cleared column means the
    /// record has already been migrated to the current hash algorithm.
    pub fn is_empty_field(&self, name: &str) -> bool {
        match self.fields.get(name) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        }
    }

    /// True if every (field, value) pair of `filter` matches this record.
    pub fn matches(&self, filter: &BTreeMap<String, Value>) -> bool {
        filter.iter().all(|(k, v)| self.fields.get(k) == Some(v))
    }

    /// Merge `fields` into this record, replacing existing values.
    pub fn apply(&mut self, fields: &Record) {
        for (k, v) in &fields.fields {
            self.fields.insert(k.clone(), v.clone());
        }
    }

    /// Iterate over (field, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
