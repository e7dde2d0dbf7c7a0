//! Change-feed reactor
//!
//! Consumes batches of store change records and derives the fan-out events
//! that were deliberately not pushed synchronously: join and leave
//! announcements. Classification is one pure dispatch function over the
//! type prefixes of the two key components plus the change kind — the
//! single table that replaces branching on raw key strings.
//!
//! The reactor keeps no cursor and no state between batches. The feed
//! delivers at least once, so every reaction here is safe to run more than
//! once for the same record: announcements re-read membership from the
//! store and re-push, which duplicates a notification at worst.

use futures::future::join_all;

use crate::error::StoreError;
use crate::fanout::{Event, FanoutEngine};
use crate::keys::{parse_entity_id, EntityKind};
use crate::store::{ChangeKind, ChangeRecord};
use crate::subscriptions::SubscriptionIndex;

/// Direction of a membership change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// A session joined the channel
    Joined,
    /// A session left the channel
    Left,
}

/// What one change record calls for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Announce a membership change to the channel's current subscribers
    Announce {
        /// Channel whose membership changed
        channel_id: String,
        /// Session that joined or left
        subscriber_id: String,
        /// Which direction
        change: MembershipChange,
    },
    /// Nothing to do for this record
    Ignore,
}

/// Classify one change record
///
/// | Primary key | Range key | Kind       | Reaction                       |
/// |-------------|-----------|------------|--------------------------------|
/// | Channel     | Session   | insert     | announce join                  |
/// | Channel     | Session   | remove     | announce leave                 |
/// | Channel     | Session   | update     | ignore (idempotent re-join)    |
/// | Channel     | Message   | insert     | ignore (guarded, see below)    |
/// | Channel     | Message   | non-insert | ignore                         |
/// | Session     | any       | any        | ignore                         |
/// | other       | any       | any        | ignore                         |
///
/// The message-insert row is reserved for out-of-band writers posting
/// directly to the store. It stays a guarded no-op here because the
/// synchronous post path already delivered — reacting again would push the
/// same message twice. Anyone wiring that path up must route around the
/// synchronous delivery first.
pub fn classify(record: &ChangeRecord) -> Reaction {
    match (
        EntityKind::of(&record.key),
        EntityKind::of(&record.range_key),
        record.kind,
    ) {
        (Some(EntityKind::Channel), Some(EntityKind::Session), ChangeKind::Insert) => {
            Reaction::Announce {
                channel_id: parse_entity_id(record.key.as_str()),
                subscriber_id: parse_entity_id(record.range_key.as_str()),
                change: MembershipChange::Joined,
            }
        }
        (Some(EntityKind::Channel), Some(EntityKind::Session), ChangeKind::Remove) => {
            Reaction::Announce {
                channel_id: parse_entity_id(record.key.as_str()),
                subscriber_id: parse_entity_id(record.range_key.as_str()),
                change: MembershipChange::Left,
            }
        }
        // An idempotent re-join surfaces as an update; nothing changed
        (Some(EntityKind::Channel), Some(EntityKind::Session), ChangeKind::Update) => {
            Reaction::Ignore
        }
        (Some(EntityKind::Channel), Some(EntityKind::Message), _) => Reaction::Ignore,
        _ => Reaction::Ignore,
    }
}

/// Feed-driven derivation of fan-out events
#[derive(Clone)]
pub struct ChangeFeedReactor {
    index: SubscriptionIndex,
    fanout: FanoutEngine,
}

impl ChangeFeedReactor {
    /// Create a reactor over the given index and fan-out engine
    pub fn new(index: SubscriptionIndex, fanout: FanoutEngine) -> Self {
        Self { index, fanout }
    }

    /// Process one batch of change records
    ///
    /// Records are processed concurrently; a failure on one record never
    /// blocks the others. Every record runs to the all-complete barrier,
    /// then the first failure in record order is surfaced so the feed's
    /// redelivery can retry the batch — safe, since every reaction is
    /// idempotent.
    pub async fn process_batch(&self, records: &[ChangeRecord]) -> Result<(), StoreError> {
        let outcomes = join_all(records.iter().map(|record| self.process_record(record))).await;

        for outcome in outcomes {
            outcome?;
        }
        Ok(())
    }

    async fn process_record(&self, record: &ChangeRecord) -> Result<(), StoreError> {
        match classify(record) {
            Reaction::Ignore => {
                tracing::trace!(key = %record.key, range_key = %record.range_key, "Change ignored");
                Ok(())
            }
            Reaction::Announce {
                channel_id,
                subscriber_id,
                change,
            } => {
                let result = self.announce(&channel_id, &subscriber_id, change).await;
                if let Err(ref error) = result {
                    tracing::warn!(
                        channel = %channel_id,
                        subscriber = %subscriber_id,
                        error = %error,
                        "Membership announcement failed"
                    );
                }
                result
            }
        }
    }

    /// Deliver a join/leave announcement to the channel's current members
    ///
    /// Membership is read when the record is processed: a joining session
    /// is already in the table and hears its own announcement; a leaving
    /// session is already gone and does not.
    async fn announce(
        &self,
        channel_id: &str,
        subscriber_id: &str,
        change: MembershipChange,
    ) -> Result<(), StoreError> {
        let recipients = self.index.sessions_for_channel(channel_id).await?;

        let event = match change {
            MembershipChange::Joined => Event::SubscriberSub {
                channel_id: channel_id.to_string(),
                subscriber_id: subscriber_id.to_string(),
            },
            MembershipChange::Left => Event::SubscriberUnsub {
                channel_id: channel_id.to_string(),
                subscriber_id: subscriber_id.to_string(),
            },
        };

        let report = self.fanout.deliver(&recipients, &event).await;
        tracing::debug!(
            channel = %channel_id,
            subscriber = %subscriber_id,
            event = event.tag(),
            delivered = report.delivered(),
            "Membership announced"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::fanout::testing::RecordingTransport;
    use crate::fanout::Transport;
    use crate::store::{KeyedStore, MemoryStore, Record};

    fn record(key: &str, range_key: &str, kind: ChangeKind) -> ChangeRecord {
        ChangeRecord::new(key, range_key, kind)
    }

    #[test]
    fn test_classify_subscription_changes() {
        assert_eq!(
            classify(&record("CHANNEL|General", "SESSION|B", ChangeKind::Insert)),
            Reaction::Announce {
                channel_id: "General".to_string(),
                subscriber_id: "B".to_string(),
                change: MembershipChange::Joined,
            }
        );
        assert_eq!(
            classify(&record("CHANNEL|General", "SESSION|B", ChangeKind::Remove)),
            Reaction::Announce {
                channel_id: "General".to_string(),
                subscriber_id: "B".to_string(),
                change: MembershipChange::Left,
            }
        );
        assert_eq!(
            classify(&record("CHANNEL|General", "SESSION|B", ChangeKind::Update)),
            Reaction::Ignore
        );
    }

    #[test]
    fn test_classify_ignores_messages_and_sessions() {
        // Message inserts are reserved for out-of-band writers; guarded off
        assert_eq!(
            classify(&record("CHANNEL|General", "MESSAGE|100", ChangeKind::Insert)),
            Reaction::Ignore
        );
        assert_eq!(
            classify(&record("CHANNEL|General", "MESSAGE|100", ChangeKind::Remove)),
            Reaction::Ignore
        );
        assert_eq!(
            classify(&record("SESSION|A", "CHANNEL|General", ChangeKind::Insert)),
            Reaction::Ignore
        );
        assert_eq!(
            classify(&record("unprefixed", "SESSION|A", ChangeKind::Insert)),
            Reaction::Ignore
        );
    }

    fn reactor_fixture() -> (ChangeFeedReactor, SubscriptionIndex, Arc<RecordingTransport>) {
        let store = Arc::new(MemoryStore::new());
        let index = SubscriptionIndex::new(store);
        let transport = Arc::new(RecordingTransport::default());
        let fanout = FanoutEngine::new(Arc::clone(&transport) as Arc<dyn Transport>);
        (
            ChangeFeedReactor::new(index.clone(), fanout),
            index,
            transport,
        )
    }

    #[tokio::test]
    async fn test_join_announced_to_all_members_including_joiner() {
        let (reactor, index, transport) = reactor_fixture();

        index.join("General", "A").await.unwrap();
        index.join("General", "B").await.unwrap();

        reactor
            .process_batch(&[record("CHANNEL|General", "SESSION|B", ChangeKind::Insert)])
            .await
            .unwrap();

        let events = transport.pushed_events();
        assert_eq!(events.len(), 2);
        for (_, event) in &events {
            assert_eq!(
                *event,
                Event::SubscriberSub {
                    channel_id: "General".to_string(),
                    subscriber_id: "B".to_string(),
                }
            );
        }
        let recipients: Vec<&str> = events.iter().map(|(id, _)| id.as_str()).collect();
        assert!(recipients.contains(&"A"));
        // Membership is read after the insert is visible: the joiner hears
        // its own announcement
        assert!(recipients.contains(&"B"));
    }

    #[tokio::test]
    async fn test_leave_announced_to_remaining_members_only() {
        let (reactor, index, transport) = reactor_fixture();

        // A already left; only B remains
        index.join("General", "B").await.unwrap();

        reactor
            .process_batch(&[record("CHANNEL|General", "SESSION|A", ChangeKind::Remove)])
            .await
            .unwrap();

        let events = transport.pushed_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "B");
        assert_eq!(
            events[0].1,
            Event::SubscriberUnsub {
                channel_id: "General".to_string(),
                subscriber_id: "A".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_message_insert_produces_no_pushes() {
        let (reactor, index, transport) = reactor_fixture();

        index.join("General", "A").await.unwrap();

        reactor
            .process_batch(&[record(
                "CHANNEL|General",
                "MESSAGE|1700000000000",
                ChangeKind::Insert,
            )])
            .await
            .unwrap();

        assert!(transport.pushed_events().is_empty());
    }

    #[tokio::test]
    async fn test_reprocessing_same_record_is_safe() {
        let (reactor, index, transport) = reactor_fixture();

        index.join("General", "A").await.unwrap();
        let batch = [record("CHANNEL|General", "SESSION|A", ChangeKind::Insert)];

        reactor.process_batch(&batch).await.unwrap();
        reactor.process_batch(&batch).await.unwrap();

        // Redelivery duplicates the announcement, nothing worse
        assert_eq!(transport.pushed_events().len(), 2);
    }

    /// Store wrapper that fails membership reads for one channel key
    struct FlakyStore {
        inner: MemoryStore,
        fail_key: String,
    }

    #[async_trait]
    impl KeyedStore for FlakyStore {
        async fn put(&self, record: Record) -> Result<(), crate::error::StoreError> {
            self.inner.put(record).await
        }
        async fn delete(
            &self,
            key: &str,
            range_key: &str,
        ) -> Result<(), crate::error::StoreError> {
            self.inner.delete(key, range_key).await
        }
        async fn query(
            &self,
            key: &str,
            range_prefix: &str,
        ) -> Result<Vec<Record>, crate::error::StoreError> {
            if key == self.fail_key {
                return Err(crate::error::StoreError::Read("simulated outage".to_string()));
            }
            self.inner.query(key, range_prefix).await
        }
        async fn query_reverse(
            &self,
            range_key: &str,
            key_prefix: &str,
        ) -> Result<Vec<Record>, crate::error::StoreError> {
            self.inner.query_reverse(range_key, key_prefix).await
        }
    }

    #[tokio::test]
    async fn test_one_failing_record_does_not_block_batch() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_key: "CHANNEL|Broken".to_string(),
        });
        let index = SubscriptionIndex::new(Arc::clone(&store) as Arc<dyn KeyedStore>);
        let transport = Arc::new(RecordingTransport::default());
        let fanout = FanoutEngine::new(Arc::clone(&transport) as Arc<dyn Transport>);
        let reactor = ChangeFeedReactor::new(index.clone(), fanout);

        index.join("General", "A").await.unwrap();

        let result = reactor
            .process_batch(&[
                record("CHANNEL|Broken", "SESSION|X", ChangeKind::Insert),
                record("CHANNEL|General", "SESSION|A", ChangeKind::Insert),
            ])
            .await;

        // The failure is surfaced for redelivery...
        assert!(result.is_err());
        // ...but the healthy record was still fully processed
        let events = transport.pushed_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "A");
    }
}
