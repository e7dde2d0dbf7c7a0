//! Keyed store collaborator contract

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::record::Record;

/// The durable keyed store consumed by the relay core
///
/// Implementations must make writes immediately visible to subsequent reads
/// issued from the same process. No cross-record transaction primitive is
/// assumed: every write touches exactly one record, and the relay's
/// mutations are commutative (last write wins, delete is idempotent).
#[async_trait]
pub trait KeyedStore: Send + Sync {
    /// Insert or overwrite one record (idempotent upsert)
    async fn put(&self, record: Record) -> Result<(), StoreError>;

    /// Delete the record with the given key pair; deleting a record that
    /// does not exist is a no-op, not an error
    async fn delete(&self, key: &str, range_key: &str) -> Result<(), StoreError>;

    /// All records whose primary key equals `key` and whose range key
    /// starts with `range_prefix`, in range-key order
    async fn query(&self, key: &str, range_prefix: &str) -> Result<Vec<Record>, StoreError>;

    /// The same scan shape over the secondary index with key and range
    /// swapped: all records whose range key equals `range_key` and whose
    /// primary key starts with `key_prefix`, in primary-key order
    async fn query_reverse(
        &self,
        range_key: &str,
        key_prefix: &str,
    ) -> Result<Vec<Record>, StoreError>;
}
