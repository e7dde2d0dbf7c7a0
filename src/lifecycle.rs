//! Session lifecycle manager
//!
//! Two terminal transitions per session, nothing in between: on start the
//! session is auto-joined to the default channel, on end every remaining
//! subscription is removed. No per-session state is kept here — existence
//! of a session is the transport layer's concern, and membership lives in
//! the store.

use futures::future::join_all;

use crate::error::StoreError;
use crate::subscriptions::SubscriptionIndex;

/// Start/end handling for transport sessions
#[derive(Clone)]
pub struct SessionLifecycle {
    index: SubscriptionIndex,
    default_channel: String,
}

impl SessionLifecycle {
    /// Create a lifecycle manager joining new sessions to `default_channel`
    pub fn new(index: SubscriptionIndex, default_channel: impl Into<String>) -> Self {
        Self {
            index,
            default_channel: default_channel.into(),
        }
    }

    /// Handle an established transport session
    ///
    /// Writes the default subscription and nothing else; the join
    /// announcement is derived from the store's change feed.
    pub async fn on_start(&self, session_id: &str) -> Result<(), StoreError> {
        tracing::info!(
            session = %session_id,
            channel = %self.default_channel,
            "Session started, joining default channel"
        );
        self.index.join(&self.default_channel, session_id).await
    }

    /// Handle a terminated transport session
    ///
    /// Resolves the session's channels through the reverse index and issues
    /// every leave concurrently, waiting for all of them before returning.
    /// Ending a session with no subscriptions — including a session that
    /// already ended once — is a no-op. Every leave runs to the barrier;
    /// the first store error in channel-list order is then surfaced.
    pub async fn on_end(&self, session_id: &str) -> Result<(), StoreError> {
        let channels = self.index.channels_for_session(session_id).await?;
        if channels.is_empty() {
            tracing::debug!(session = %session_id, "Session ended with no subscriptions");
            return Ok(());
        }

        tracing::info!(
            session = %session_id,
            channels = channels.len(),
            "Session ended, removing subscriptions"
        );

        let leaves = channels
            .iter()
            .map(|channel_id| self.index.leave(channel_id, session_id));
        let results = join_all(leaves).await;

        for result in results {
            result?;
        }
        Ok(())
    }
}
