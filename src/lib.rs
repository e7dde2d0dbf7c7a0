//! # chat-relay
//!
//! Channel-based chat fan-out core: sessions join named channels, post
//! messages, and receive what others post. This crate is the subscription
//! index and broadcast engine — the transport that owns the sockets and
//! the durable store that owns the bytes are injected collaborators.
//!
//! # Architecture
//!
//! ```text
//!  transport events        client actions          store change feed
//!        │                       │                        │
//!        ▼                       ▼                        ▼
//!  SessionLifecycle ──┐    Relay::on_action        ChangeFeedReactor
//!                     │      │         │                  │
//!                     ▼      ▼         ▼                  │
//!                SubscriptionIndex   MessageStore         │
//!                     │                 │                 │
//!                     └──── Arc<dyn KeyedStore> ◄─────────┤
//!                                       │                 │
//!                                       ▼                 ▼
//!                                  FanoutEngine ──► Transport::push
//! ```
//!
//! Joins are a plain store write; the matching `subscriber_sub`
//! announcement is derived from the store's change feed, so any writer —
//! including automated agents writing the store directly — triggers the
//! same notification path. Message posts deliver synchronously, and the
//! reactor deliberately ignores message inserts to avoid pushing twice.
//!
//! The core is stateless between invocations: every entry point reads the
//! store fresh, and all of them tolerate concurrent and redundant calls
//! for the same logical event.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use chat_relay::{
//!     BasicSanitizer, MemoryStore, PushError, Relay, RelayConfig, Transport,
//! };
//!
//! struct NullTransport;
//!
//! #[async_trait::async_trait]
//! impl Transport for NullTransport {
//!     async fn push(&self, _session_id: &str, _payload: Bytes) -> Result<(), PushError> {
//!         Ok(())
//!     }
//! }
//!
//! tokio_test::block_on(async {
//!     let relay = Relay::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(NullTransport),
//!         Arc::new(BasicSanitizer),
//!         RelayConfig::default(),
//!     );
//!
//!     relay.on_session_start("session-1").await.unwrap();
//!     relay
//!         .on_action("session-1", r#"{"action":"subscribe","channelId":"rust"}"#)
//!         .await
//!         .unwrap();
//!
//!     let members = relay.index().sessions_for_channel("rust").await.unwrap();
//!     assert_eq!(members, ["session-1"]);
//! });
//! ```

pub mod error;
pub mod fanout;
pub mod keys;
pub mod lifecycle;
pub mod messages;
pub mod reactor;
pub mod relay;
pub mod sanitize;
pub mod store;
pub mod subscriptions;

// Re-exports
pub use error::{PushError, RelayError, Result, StoreError};
pub use fanout::{DeliveryReport, Event, FanoutEngine, Transport};
pub use keys::{parse_entity_id, EntityKind, EntityRef, SessionDescriptor};
pub use lifecycle::SessionLifecycle;
pub use messages::{normalize_display_name, MessageStore, StoredMessage};
pub use reactor::{classify, ChangeFeedReactor, MembershipChange, Reaction};
pub use relay::{Action, Relay, RelayConfig, DEFAULT_CHANNEL};
pub use sanitize::{BasicSanitizer, Sanitizer, ALLOWED_TAGS};
pub use store::{ChangeKind, ChangeRecord, KeyedStore, MemoryStore, Record};
pub use subscriptions::SubscriptionIndex;
