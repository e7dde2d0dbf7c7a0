//! Subscription index operations

use std::sync::Arc;

use crate::error::StoreError;
use crate::keys::{parse_entity_id, EntityKind};
use crate::store::{KeyedStore, Record};

/// Bidirectional session/channel membership over the keyed store
///
/// Stateless between calls: every operation reads or writes the store
/// directly, so concurrent and redundant invocations for the same logical
/// event are safe (joins overwrite, leaves are no-ops when already gone).
#[derive(Clone)]
pub struct SubscriptionIndex {
    store: Arc<dyn KeyedStore>,
}

impl SubscriptionIndex {
    /// Create an index over the given store
    pub fn new(store: Arc<dyn KeyedStore>) -> Self {
        Self { store }
    }

    /// Subscribe a session to a channel
    ///
    /// Idempotent upsert: joining twice leaves one record. The write has no
    /// synchronous side effect — join announcements are derived from the
    /// store's change feed, so any writer (including automated agents
    /// writing the store directly) triggers the same notification path.
    pub async fn join(&self, channel_id: &str, session_id: &str) -> Result<(), StoreError> {
        let record = Record::new(
            EntityKind::Channel.key(channel_id),
            EntityKind::Session.key(session_id),
        );
        self.store.put(record).await?;

        tracing::debug!(
            channel = %channel_id,
            session = %session_id,
            "Subscription written"
        );
        Ok(())
    }

    /// Unsubscribe a session from a channel
    ///
    /// Deleting a subscription that does not exist is a no-op.
    pub async fn leave(&self, channel_id: &str, session_id: &str) -> Result<(), StoreError> {
        self.store
            .delete(
                &EntityKind::Channel.key(channel_id),
                &EntityKind::Session.key(session_id),
            )
            .await?;

        tracing::debug!(
            channel = %channel_id,
            session = %session_id,
            "Subscription deleted"
        );
        Ok(())
    }

    /// All sessions currently subscribed to a channel, used for fan-out
    pub async fn sessions_for_channel(&self, channel_id: &str) -> Result<Vec<String>, StoreError> {
        let records = self
            .store
            .query(
                &EntityKind::Channel.key(channel_id),
                EntityKind::Session.prefix(),
            )
            .await?;

        Ok(records
            .iter()
            .map(|record| parse_entity_id(record.range_key.as_str()))
            .collect())
    }

    /// All channels a session is subscribed to, used during teardown
    pub async fn channels_for_session(&self, session_id: &str) -> Result<Vec<String>, StoreError> {
        let records = self
            .store
            .query_reverse(
                &EntityKind::Session.key(session_id),
                EntityKind::Channel.prefix(),
            )
            .await?;

        Ok(records
            .iter()
            .map(|record| parse_entity_id(record.key.as_str()))
            .collect())
    }
}
