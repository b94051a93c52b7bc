//! In-memory [`Transport`]: per-conversation history, one live subscriber per conversation.
//!
//! Used by the CLI `simulate` command and by tests. [`LocalTransport::deliver`] plays the role of
//! the remote peer (including redundant re-delivery of the same message).

use crate::error::{ChatError, Result};
use crate::transport::{Subscription, Transport};
use crate::types::{Message, OutgoingMessage};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Default)]
struct LocalState {
    history: HashMap<String, Vec<Message>>,
    subscribers: HashMap<String, (u64, UnboundedSender<Message>)>,
    next_subscription_id: u64,
    sent: Vec<Message>,
    fail_sends: bool,
}

/// In-memory transport for the local user `local_user_id`.
#[derive(Clone)]
pub struct LocalTransport {
    local_user_id: String,
    state: Arc<Mutex<LocalState>>,
}

impl LocalTransport {
    pub fn new(local_user_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            state: Arc::new(Mutex::new(LocalState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    /// Adds messages to a conversation's history without delivering them live.
    pub fn seed_history(&self, conversation_id: &str, messages: Vec<Message>) {
        self.lock()
            .history
            .entry(conversation_id.to_string())
            .or_default()
            .extend(messages);
    }

    /// Delivers `message` as if it arrived from the network. History keeps one copy per id; the
    /// live subscriber receives every delivery. Returns true if a subscriber was listening.
    pub fn deliver(&self, conversation_id: &str, message: Message) -> bool {
        let mut state = self.lock();
        let history = state.history.entry(conversation_id.to_string()).or_default();
        if !history.iter().any(|m| m.id == message.id) {
            history.push(message.clone());
        }
        match state.subscribers.get(conversation_id) {
            Some((_, sender)) => sender.send(message).is_ok(),
            None => {
                debug!(conversation_id, message_id = %message.id, "No subscriber, message stored only");
                false
            }
        }
    }

    /// Messages sent through this transport, in send order.
    pub fn sent(&self) -> Vec<Message> {
        self.lock().sent.clone()
    }

    pub fn is_subscribed(&self, conversation_id: &str) -> bool {
        self.lock().subscribers.contains_key(conversation_id)
    }

    /// Makes every following `send` fail with a transport error (or succeed again).
    pub fn set_fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn subscribe(&self, conversation_id: &str) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut state = self.lock();
            state.next_subscription_id += 1;
            let id = state.next_subscription_id;
            if state
                .subscribers
                .insert(conversation_id.to_string(), (id, tx))
                .is_some()
            {
                warn!(conversation_id, "Replacing existing subscription");
            }
            id
        };
        info!(conversation_id, subscription_id = id, "Subscribed");

        let state = Arc::clone(&self.state);
        let conversation = conversation_id.to_string();
        Ok(Subscription::new(conversation_id, rx, move || {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            // A newer subscription for the same conversation must survive this one's release.
            if matches!(state.subscribers.get(&conversation), Some((current, _)) if *current == id)
            {
                state.subscribers.remove(&conversation);
            }
        }))
    }

    fn unsubscribe(&self, conversation_id: &str) {
        if self.lock().subscribers.remove(conversation_id).is_some() {
            info!(conversation_id, "Unsubscribed");
        }
    }

    async fn send(&self, conversation_id: &str, message: OutgoingMessage) -> Result<Message> {
        let mut state = self.lock();
        if state.fail_sends {
            return Err(ChatError::Transport(format!(
                "send to {} rejected",
                conversation_id
            )));
        }
        let stored = Message {
            id: Uuid::new_v4().to_string(),
            sender_id: self.local_user_id.clone(),
            receiver_id: conversation_id.to_string(),
            text: message.text,
            image: message.image,
            created_at: Utc::now(),
            translated: None,
        };
        state
            .history
            .entry(conversation_id.to_string())
            .or_default()
            .push(stored.clone());
        state.sent.push(stored.clone());
        // Echo to the live subscriber, as a real channel would.
        if let Some((_, sender)) = state.subscribers.get(conversation_id) {
            if sender.send(stored.clone()).is_err() {
                debug!(conversation_id, "Subscriber gone, echo dropped");
            }
        }
        debug!(conversation_id, message_id = %stored.id, "Message sent");
        Ok(stored)
    }

    async fn fetch_history(&self, conversation_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .lock()
            .history
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}
