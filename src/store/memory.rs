//! In-memory keyed store
//!
//! A [`KeyedStore`] over two `BTreeMap` projections of the same record set,
//! guarded by a single `tokio::sync::RwLock`. The forward map is keyed
//! `(key, range_key)`, the reverse set `(range_key, key)` — the two
//! differently-keyed views that make the subscription relation scannable
//! from either side. Both views are maintained together under one write
//! lock, so reads never observe a half-applied mutation.
//!
//! An optional change feed emits one [`ChangeRecord`] per *effective*
//! mutation: `insert` on first put, `update` on overwrite, and `remove`
//! only when a delete actually removed something. Idempotent re-joins and
//! blind deletes therefore produce exactly the feed shapes the reactor
//! expects.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::keyed::KeyedStore;
use crate::store::record::{ChangeKind, ChangeRecord, Record};

#[derive(Default)]
struct Inner {
    /// Forward projection: (key, range_key) -> fields
    rows: BTreeMap<(String, String), HashMap<String, String>>,
    /// Reverse projection: (range_key, key), fields live in `rows`
    reverse: BTreeSet<(String, String)>,
}

/// In-memory [`KeyedStore`] with an optional change feed
pub struct MemoryStore {
    inner: RwLock<Inner>,
    feed: Option<UnboundedSender<ChangeRecord>>,
}

impl MemoryStore {
    /// Create a store without a change feed
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            feed: None,
        }
    }

    /// Create a store whose mutations surface on the returned receiver
    ///
    /// The receiver yields one record per effective mutation, in the order
    /// the mutations were applied. Dropping the receiver silently disables
    /// the feed.
    pub fn with_change_feed() -> (Self, UnboundedReceiver<ChangeRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = Self {
            inner: RwLock::new(Inner::default()),
            feed: Some(tx),
        };
        (store, rx)
    }

    fn emit(&self, record: ChangeRecord) {
        if let Some(tx) = &self.feed {
            let _ = tx.send(record);
        }
    }

    /// Number of records currently stored
    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.rows.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyedStore for MemoryStore {
    async fn put(&self, record: Record) -> Result<(), StoreError> {
        let Record {
            key,
            range_key,
            fields,
        } = record;

        let kind = {
            let mut inner = self.inner.write().await;
            let existed = inner
                .rows
                .insert((key.clone(), range_key.clone()), fields)
                .is_some();
            inner.reverse.insert((range_key.clone(), key.clone()));
            if existed {
                ChangeKind::Update
            } else {
                ChangeKind::Insert
            }
        };

        self.emit(ChangeRecord::new(key, range_key, kind));
        Ok(())
    }

    async fn delete(&self, key: &str, range_key: &str) -> Result<(), StoreError> {
        let removed = {
            let mut inner = self.inner.write().await;
            let removed = inner
                .rows
                .remove(&(key.to_string(), range_key.to_string()))
                .is_some();
            if removed {
                inner
                    .reverse
                    .remove(&(range_key.to_string(), key.to_string()));
            }
            removed
        };

        if removed {
            self.emit(ChangeRecord::new(key, range_key, ChangeKind::Remove));
        }
        Ok(())
    }

    async fn query(&self, key: &str, range_prefix: &str) -> Result<Vec<Record>, StoreError> {
        let inner = self.inner.read().await;
        let start = (key.to_string(), range_prefix.to_string());

        let records = inner
            .rows
            .range(start..)
            .take_while(|((k, r), _)| k == key && r.starts_with(range_prefix))
            .map(|((k, r), fields)| Record {
                key: k.clone(),
                range_key: r.clone(),
                fields: fields.clone(),
            })
            .collect();

        Ok(records)
    }

    async fn query_reverse(
        &self,
        range_key: &str,
        key_prefix: &str,
    ) -> Result<Vec<Record>, StoreError> {
        let inner = self.inner.read().await;
        let start = (range_key.to_string(), key_prefix.to_string());

        let records = inner
            .reverse
            .range(start..)
            .take_while(|(r, k)| r == range_key && k.starts_with(key_prefix))
            .map(|(r, k)| Record {
                key: k.clone(),
                range_key: r.clone(),
                fields: inner
                    .rows
                    .get(&(k.clone(), r.clone()))
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();

        Ok(records)
    }
}
