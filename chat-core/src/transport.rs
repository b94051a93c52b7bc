//! Transport abstraction for subscribing to, sending and fetching conversation messages.
//!
//! [`Transport`] is implementation-agnostic; [`crate::LocalTransport`] implements it in memory.

use crate::error::Result;
use crate::types::{Message, OutgoingMessage};
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

/// Publish/subscribe channel that carries the messages of one-to-one conversations. The
/// conversation id is the peer's user id.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Starts live delivery for `conversation_id`. Delivery stops when the returned
    /// [`Subscription`] is dropped or released.
    async fn subscribe(&self, conversation_id: &str) -> Result<Subscription>;
    /// Stops live delivery for `conversation_id`. Idempotent.
    fn unsubscribe(&self, conversation_id: &str);
    /// Sends a message authored by the local user and returns the stored message.
    async fn send(&self, conversation_id: &str, message: OutgoingMessage) -> Result<Message>;
    /// Returns the stored history of `conversation_id`, oldest first.
    async fn fetch_history(&self, conversation_id: &str) -> Result<Vec<Message>>;
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Live message feed of one conversation. Unsubscribes when dropped, so the subscription is
/// released on every exit path of its owner, including task abort.
pub struct Subscription {
    conversation_id: String,
    receiver: UnboundedReceiver<Message>,
    release: Option<ReleaseFn>,
}

impl Subscription {
    /// Wraps `receiver`; `release` runs exactly once, on [`Subscription::release`] or drop.
    pub fn new(
        conversation_id: impl Into<String>,
        receiver: UnboundedReceiver<Message>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            receiver,
            release: Some(Box::new(release)),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Next delivered message; `None` once the transport closed the feed.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Unsubscribes now instead of at drop.
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            debug!(conversation_id = %self.conversation_id, "step: subscription released");
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("conversation_id", &self.conversation_id)
            .field("released", &self.release.is_none())
            .finish()
    }
}
