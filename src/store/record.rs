//! Store record and change-feed types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One row in the backing table
///
/// A record is addressed by its `(key, range_key)` pair; any further
/// attributes are carried as named string fields. Subscription rows have no
/// fields at all — the key pair is the whole relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Primary key component
    pub key: String,
    /// Range key component
    pub range_key: String,
    /// Named attributes beyond the key pair
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
}

impl Record {
    /// Create a record with no extra fields
    pub fn new(key: impl Into<String>, range_key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            range_key: range_key.into(),
            fields: HashMap::new(),
        }
    }

    /// Attach a named field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a named field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Kind of mutation reported by the store's change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A record was created
    Insert,
    /// An existing record was overwritten
    Update,
    /// A record was deleted
    Remove,
}

/// One change-feed entry: a single mutation of a single key pair
///
/// The feed delivers these at least once, ordered per key, batched
/// arbitrarily. Consumers must tolerate redelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Primary key component of the mutated record
    pub key: String,
    /// Range key component of the mutated record
    pub range_key: String,
    /// What happened to the record
    pub kind: ChangeKind,
}

impl ChangeRecord {
    /// Create a change record
    pub fn new(key: impl Into<String>, range_key: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            key: key.into(),
            range_key: range_key.into(),
            kind,
        }
    }
}
