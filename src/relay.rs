//! Relay facade and action dispatch
//!
//! The entry points consumed by the transport/compute glue. Each call is
//! one independent, stateless activation: the relay holds no session or
//! channel state of its own, only the injected collaborators, and is cheap
//! to clone per activation.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{RelayError, Result};
use crate::fanout::{DeliveryReport, Event, FanoutEngine, Transport};
use crate::lifecycle::SessionLifecycle;
use crate::messages::MessageStore;
use crate::reactor::ChangeFeedReactor;
use crate::sanitize::Sanitizer;
use crate::store::{ChangeRecord, KeyedStore};
use crate::subscriptions::SubscriptionIndex;

/// Channel every new session is joined to when none is chosen
pub const DEFAULT_CHANNEL: &str = "General";

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Channel every new session is automatically joined to
    pub default_channel: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_channel: DEFAULT_CHANNEL.to_string(),
        }
    }
}

impl RelayConfig {
    /// Set the default channel
    pub fn default_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.default_channel = channel_id.into();
        self
    }
}

/// Client action body, routed by its `action` field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action")]
pub enum Action {
    /// Join a channel
    #[serde(rename = "subscribe", rename_all = "camelCase")]
    Subscribe {
        /// Channel to join
        channel_id: String,
    },
    /// Leave a channel
    #[serde(rename = "unsubscribe", rename_all = "camelCase")]
    Unsubscribe {
        /// Channel to leave
        channel_id: String,
    },
    /// Post a message to a channel
    #[serde(rename = "sendMessage", rename_all = "camelCase")]
    SendMessage {
        /// Channel to post to
        channel_id: String,
        /// Sender display name, normalized before persisting
        name: String,
        /// Message content, sanitized before persisting
        content: String,
    },
}

const KNOWN_ACTIONS: &[&str] = &["subscribe", "unsubscribe", "sendMessage"];

impl Action {
    /// Parse a client body
    ///
    /// `Ok(None)` means a well-formed body naming an unrecognized action —
    /// reported back to the session over the wire, not an error. A body
    /// that is not JSON, has no string `action`, or is missing a required
    /// field is a validation error; nothing has been written when one is
    /// returned.
    pub fn from_body(body: &str) -> Result<Option<Action>> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| RelayError::Validation(format!("malformed body: {}", e)))?;

        let kind = value
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| RelayError::Validation("missing field `action`".to_string()))?
            .to_string();

        if !KNOWN_ACTIONS.contains(&kind.as_str()) {
            return Ok(None);
        }

        let action = serde_json::from_value(value)
            .map_err(|e| RelayError::Validation(format!("invalid `{}` body: {}", kind, e)))?;
        Ok(Some(action))
    }
}

/// The relay core: subscription index, message log, fan-out, lifecycle,
/// and change-feed reaction behind one facade
///
/// All collaborators are constructor-injected; nothing here is a
/// process-wide singleton.
#[derive(Clone)]
pub struct Relay {
    config: RelayConfig,
    index: SubscriptionIndex,
    messages: MessageStore,
    fanout: FanoutEngine,
    lifecycle: SessionLifecycle,
    reactor: ChangeFeedReactor,
}

impl Relay {
    /// Assemble a relay from its collaborators
    pub fn new(
        store: Arc<dyn KeyedStore>,
        transport: Arc<dyn Transport>,
        sanitizer: Arc<dyn Sanitizer>,
        config: RelayConfig,
    ) -> Self {
        let index = SubscriptionIndex::new(Arc::clone(&store));
        let fanout = FanoutEngine::new(transport);
        let messages = MessageStore::new(store, sanitizer);
        let lifecycle = SessionLifecycle::new(index.clone(), config.default_channel.clone());
        let reactor = ChangeFeedReactor::new(index.clone(), fanout.clone());

        Self {
            config,
            index,
            messages,
            fanout,
            lifecycle,
            reactor,
        }
    }

    /// The configuration this relay was built with
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// The subscription index backing this relay
    pub fn index(&self) -> &SubscriptionIndex {
        &self.index
    }

    /// Handle an established transport session
    pub async fn on_session_start(&self, session_id: &str) -> Result<()> {
        self.lifecycle.on_start(session_id).await?;
        Ok(())
    }

    /// Handle a terminated transport session
    pub async fn on_session_end(&self, session_id: &str) -> Result<()> {
        self.lifecycle.on_end(session_id).await?;
        Ok(())
    }

    /// Handle one client action body sent by a session
    ///
    /// Routes `subscribe`, `unsubscribe`, and `sendMessage`. An
    /// unrecognized action is answered with an `error` event pushed back to
    /// the calling session and reported as success.
    pub async fn on_action(&self, session_id: &str, body: &str) -> Result<()> {
        match Action::from_body(body)? {
            Some(Action::Subscribe { channel_id }) => {
                self.index.join(&channel_id, session_id).await?;
                Ok(())
            }
            Some(Action::Unsubscribe { channel_id }) => {
                self.index.leave(&channel_id, session_id).await?;
                Ok(())
            }
            Some(Action::SendMessage {
                channel_id,
                name,
                content,
            }) => {
                self.post_message(&channel_id, session_id, &name, &content)
                    .await?;
                Ok(())
            }
            None => {
                tracing::debug!(session = %session_id, "Unknown action type");
                self.fanout
                    .deliver(
                        &[session_id.to_string()],
                        &Event::Error {
                            message: "invalid action type".to_string(),
                        },
                    )
                    .await;
                Ok(())
            }
        }
    }

    /// Handle one batch of store change records
    pub async fn on_change_batch(&self, records: &[ChangeRecord]) -> Result<()> {
        self.reactor.process_batch(records).await?;
        Ok(())
    }

    /// Persist a message and fan it out to the channel's current members
    ///
    /// The membership is resolved after the write succeeds; if the write
    /// fails, nothing is delivered.
    pub async fn post_message(
        &self,
        channel_id: &str,
        sender_session_id: &str,
        raw_name: &str,
        raw_content: &str,
    ) -> Result<DeliveryReport> {
        let message = self
            .messages
            .append(channel_id, sender_session_id, raw_name, raw_content)
            .await?;

        let recipients = self.index.sessions_for_channel(channel_id).await?;
        let event = Event::ChannelMessage {
            channel_id: message.channel_id,
            name: message.name,
            content: message.content,
        };
        Ok(self.fanout.deliver(&recipients, &event).await)
    }
}
