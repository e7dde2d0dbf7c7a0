//! Wire events and fan-out engine
//!
//! The engine turns one event and a resolved recipient set into concurrent
//! transport pushes. The event is serialized once; the `Bytes` payload is
//! reference counted, so every recipient shares the same allocation and
//! per-recipient cost is a pointer clone.
//!
//! Failure policy, fixed and tested: a failed push never aborts sibling
//! pushes dispatched in the same call, and the aggregate call succeeds
//! whenever every push was attempted — per-recipient failures are listed
//! in the returned [`DeliveryReport`], not raised.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::error::PushError;

/// Wire event pushed to sessions
///
/// Serialized as JSON with an `event` tag and camelCase fields, e.g.
/// `{"event":"channel_message","channelId":"General","name":"Bob",...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A message posted to a channel
    #[serde(rename_all = "camelCase")]
    ChannelMessage {
        /// Channel the message was posted to
        channel_id: String,
        /// Normalized sender display name
        name: String,
        /// Sanitized message content
        content: String,
    },
    /// A session joined a channel
    #[serde(rename_all = "camelCase")]
    SubscriberSub {
        /// Channel that gained a member
        channel_id: String,
        /// Session that joined
        subscriber_id: String,
    },
    /// A session left a channel
    #[serde(rename_all = "camelCase")]
    SubscriberUnsub {
        /// Channel that lost a member
        channel_id: String,
        /// Session that left
        subscriber_id: String,
    },
    /// An error reported back to the acting session
    Error {
        /// Human-readable reason
        message: String,
    },
}

impl Event {
    /// Serialize to the JSON wire payload
    pub fn to_payload(&self) -> Bytes {
        // Only string fields and a string tag: JSON serialization of this
        // enum cannot fail.
        Bytes::from(serde_json::to_vec(self).expect("event serializes to JSON"))
    }

    /// The wire tag for this event
    pub fn tag(&self) -> &'static str {
        match self {
            Event::ChannelMessage { .. } => "channel_message",
            Event::SubscriberSub { .. } => "subscriber_sub",
            Event::SubscriberUnsub { .. } => "subscriber_unsub",
            Event::Error { .. } => "error",
        }
    }
}

/// Transport collaborator: pushes a payload to one live session
///
/// A push failure means the session is unreachable (typically already
/// disconnected). The engine treats it as a non-fatal, per-recipient
/// outcome.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Push `payload` to the session identified by `session_id`
    async fn push(&self, session_id: &str, payload: Bytes) -> Result<(), PushError>;
}

/// Outcome of one fan-out call
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    /// Number of recipients a push was dispatched to
    pub attempted: usize,
    /// Recipients whose push failed, with the failure
    pub failures: Vec<(String, PushError)>,
}

impl DeliveryReport {
    /// Number of pushes that succeeded
    pub fn delivered(&self) -> usize {
        self.attempted - self.failures.len()
    }

    /// Whether every push succeeded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Concurrent delivery of one event to a resolved set of sessions
#[derive(Clone)]
pub struct FanoutEngine {
    transport: Arc<dyn Transport>,
}

impl FanoutEngine {
    /// Create an engine over the given transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Deliver `event` to every recipient concurrently
    ///
    /// All pushes are dispatched without waiting for one another and joined
    /// with an all-complete barrier. Failed recipients are collected in the
    /// report; they never short-circuit in-flight sibling pushes and never
    /// fail the call.
    pub async fn deliver(&self, recipients: &[String], event: &Event) -> DeliveryReport {
        let payload = event.to_payload();

        let pushes = recipients.iter().map(|session_id| {
            let payload = payload.clone();
            async move { (session_id, self.transport.push(session_id, payload).await) }
        });
        let results = join_all(pushes).await;

        let mut report = DeliveryReport {
            attempted: recipients.len(),
            failures: Vec::new(),
        };
        for (session_id, result) in results {
            if let Err(error) = result {
                tracing::warn!(
                    session = %session_id,
                    event = event.tag(),
                    error = %error,
                    "Push failed"
                );
                report.failures.push((session_id.clone(), error));
            }
        }

        tracing::debug!(
            event = event.tag(),
            attempted = report.attempted,
            delivered = report.delivered(),
            "Fan-out complete"
        );
        report
    }
}
