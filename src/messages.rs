//! Message store and ingestion
//!
//! Posted messages are appended to a per-channel log: the channel key is
//! the primary component, a time-derived message id is the range
//! component, so a prefix scan reads a channel's history in chronological
//! order. Messages are never mutated or deleted by this core.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::StoreError;
use crate::keys::EntityKind;
use crate::sanitize::{Sanitizer, ALLOWED_TAGS};
use crate::store::{KeyedStore, Record};

/// Field carrying the sender's session id on a message record
pub const FIELD_SENDER: &str = "senderId";
/// Field carrying the normalized display name on a message record
pub const FIELD_NAME: &str = "name";
/// Field carrying the sanitized content on a message record
pub const FIELD_CONTENT: &str = "content";

/// A message as persisted, ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Channel the message was posted to
    pub channel_id: String,
    /// Time-derived message id (range key component, prefix included)
    pub message_id: String,
    /// Normalized sender display name
    pub name: String,
    /// Sanitized content
    pub content: String,
}

/// Append-only per-channel message log
#[derive(Clone)]
pub struct MessageStore {
    store: Arc<dyn KeyedStore>,
    sanitizer: Arc<dyn Sanitizer>,
}

impl MessageStore {
    /// Create a message store over the given backing store and sanitizer
    pub fn new(store: Arc<dyn KeyedStore>, sanitizer: Arc<dyn Sanitizer>) -> Self {
        Self { store, sanitizer }
    }

    /// Normalize, sanitize, and persist one posted message
    ///
    /// If the store write fails the whole post fails; nothing is delivered
    /// and no partial state is left behind (the write is a single record).
    pub async fn append(
        &self,
        channel_id: &str,
        sender_session_id: &str,
        raw_name: &str,
        raw_content: &str,
    ) -> Result<StoredMessage, StoreError> {
        let message_id = next_message_id();
        let name = normalize_display_name(raw_name);
        let content = self.sanitizer.sanitize(raw_content, ALLOWED_TAGS);

        let record = Record::new(EntityKind::Channel.key(channel_id), message_id.clone())
            .with_field(FIELD_SENDER, sender_session_id)
            .with_field(FIELD_NAME, name.clone())
            .with_field(FIELD_CONTENT, content.clone());
        self.store.put(record).await?;

        tracing::debug!(
            channel = %channel_id,
            message = %message_id,
            sender = %sender_session_id,
            "Message persisted"
        );

        Ok(StoredMessage {
            channel_id: channel_id.to_string(),
            message_id,
            name,
            content,
        })
    }
}

/// Normalize a display name
///
/// Keeps ASCII alphanumerics, whitespace, and hyphens, trims the result,
/// then replaces each literal `"+s"` with `"-"`. The replacement can never
/// fire — a `'+'` does not survive the filter — but dropping it would
/// change the normalization contract, so it stays, pinned by
/// `test_plus_s_replacement_is_dead`.
pub fn normalize_display_name(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    kept.trim().replace("+s", "-")
}

/// Mint a message id from the current wall-clock time
///
/// Unpadded decimal milliseconds, as the range key's natural (lexicographic)
/// ordering equals numeric ordering while timestamps are 13 digits — which
/// holds until the year 2286. Posts landing in the same millisecond collide,
/// which is acceptable: there is no history-read API, and the overwrite
/// loses nothing that delivery did not already carry.
fn next_message_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    message_id_at(millis)
}

fn message_id_at(millis: u128) -> String {
    EntityKind::Message.key(&millis.to_string())
}
