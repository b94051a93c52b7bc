//! Per-session state shared by the orchestrator: the active conversation's message log, the
//! enrichment map keyed by message id, and a broadcast of partial enrichment results.

use chat_core::Message;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::debug;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Enrichment attached to one message. Each field fills in independently as its remote call
/// completes; an absent field means "unknown", never an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentState {
    pub sentiment_label: Option<String>,
    pub suggestions: Vec<String>,
    pub translation: Option<String>,
}

/// One partial enrichment result, published as soon as it is merged.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentUpdate {
    Sentiment {
        message_id: String,
        label: String,
    },
    Suggestions {
        message_id: String,
        suggestions: Vec<String>,
    },
    Translation {
        message_id: String,
        text: String,
    },
}

impl EnrichmentUpdate {
    pub fn message_id(&self) -> &str {
        match self {
            EnrichmentUpdate::Sentiment { message_id, .. }
            | EnrichmentUpdate::Suggestions { message_id, .. }
            | EnrichmentUpdate::Translation { message_id, .. } => message_id,
        }
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    conversation_id: Option<String>,
    messages: Vec<Message>,
    enrichment: HashMap<String, EnrichmentState>,
    latest_suggestions: Vec<String>,
}

impl SessionInner {
    fn contains(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.id == message_id)
    }
}

/// Shared session state. Cheap to read concurrently; every write is keyed by message id, so
/// results landing out of order merge cleanly.
#[derive(Debug)]
pub struct SessionState {
    inner: RwLock<SessionInner>,
    updates: broadcast::Sender<EnrichmentUpdate>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: RwLock::new(SessionInner::default()),
            updates,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Switches to `conversation_id` with `history` as the initial log. Enrichment of the
    /// previous conversation is discarded.
    pub fn reset(&self, conversation_id: &str, history: Vec<Message>) {
        let mut inner = self.write();
        inner.conversation_id = Some(conversation_id.to_string());
        inner.messages.clear();
        for message in history {
            if !inner.contains(&message.id) {
                inner.messages.push(message);
            }
        }
        inner.enrichment.clear();
        inner.latest_suggestions.clear();
        debug!(
            conversation_id = %conversation_id,
            history = inner.messages.len(),
            "step: session reset"
        );
    }

    pub fn clear(&self) {
        *self.write() = SessionInner::default();
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.read().conversation_id.clone()
    }

    /// Appends `message` to the log. Returns false if a message with the same id is already
    /// there.
    pub fn append(&self, message: Message) -> bool {
        let mut inner = self.write();
        if inner.contains(&message.id) {
            return false;
        }
        inner.messages.push(message);
        true
    }

    /// Appends a message the local user just sent, unless the session has moved on to another
    /// conversation in the meantime.
    pub fn append_sent(&self, message: Message) -> bool {
        let mut inner = self.write();
        if inner.conversation_id.as_deref() != Some(message.receiver_id.as_str())
            || inner.contains(&message.id)
        {
            return false;
        }
        inner.messages.push(message);
        true
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.read().contains(message_id)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.read().messages.clone()
    }

    /// The last `limit` messages of the log, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<Message> {
        let inner = self.read();
        let start = inner.messages.len().saturating_sub(limit);
        inner.messages[start..].to_vec()
    }

    pub fn last_message(&self) -> Option<Message> {
        self.read().messages.last().cloned()
    }

    pub fn message(&self, message_id: &str) -> Option<Message> {
        self.read()
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
    }

    pub fn enrichment(&self, message_id: &str) -> Option<EnrichmentState> {
        self.read().enrichment.get(message_id).cloned()
    }

    pub fn latest_suggestions(&self) -> Vec<String> {
        self.read().latest_suggestions.clone()
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<EnrichmentUpdate> {
        self.updates.subscribe()
    }

    /// Records the sentiment label of `message_id`. Ignored when the message is no longer in
    /// the log (the session switched conversation while the call was in flight).
    pub fn set_sentiment(&self, message_id: &str, label: String) -> bool {
        {
            let mut inner = self.write();
            if !inner.contains(message_id) {
                return self.stale(message_id, "sentiment");
            }
            inner
                .enrichment
                .entry(message_id.to_string())
                .or_default()
                .sentiment_label = Some(label.clone());
        }
        self.publish(EnrichmentUpdate::Sentiment {
            message_id: message_id.to_string(),
            label,
        });
        true
    }

    /// Records the suggestions of `message_id`; they also become the latest suggestion set.
    pub fn set_suggestions(&self, message_id: &str, suggestions: Vec<String>) -> bool {
        {
            let mut inner = self.write();
            if !inner.contains(message_id) {
                return self.stale(message_id, "suggestions");
            }
            inner
                .enrichment
                .entry(message_id.to_string())
                .or_default()
                .suggestions = suggestions.clone();
            inner.latest_suggestions = suggestions.clone();
        }
        self.publish(EnrichmentUpdate::Suggestions {
            message_id: message_id.to_string(),
            suggestions,
        });
        true
    }

    /// Attaches a translation to the logged message and its enrichment entry.
    pub fn attach_translation(&self, message_id: &str, text: String) -> bool {
        {
            let mut inner = self.write();
            let Some(message) = inner.messages.iter_mut().find(|m| m.id == message_id) else {
                return self.stale(message_id, "translation");
            };
            message.translated = Some(text.clone());
            inner
                .enrichment
                .entry(message_id.to_string())
                .or_default()
                .translation = Some(text.clone());
        }
        self.publish(EnrichmentUpdate::Translation {
            message_id: message_id.to_string(),
            text,
        });
        true
    }

    fn stale(&self, message_id: &str, kind: &'static str) -> bool {
        debug!(message_id = %message_id, kind, "step: result for message outside session dropped");
        false
    }

    fn publish(&self, update: EnrichmentUpdate) {
        // No receivers is fine.
        let _ = self.updates.send(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(ids: &[&str]) -> SessionState {
        let session = SessionState::new();
        let history = ids
            .iter()
            .map(|id| Message::text(*id, "peer", "me", format!("text {}", id)))
            .collect();
        session.reset("peer", history);
        session
    }

    #[test]
    fn test_append_rejects_known_id() {
        let session = session_with(&["m1"]);
        assert!(!session.append(Message::text("m1", "peer", "me", "again")));
        assert!(session.append(Message::text("m2", "peer", "me", "new")));
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_recent_takes_tail() {
        let session = session_with(&["a", "b", "c", "d"]);
        let ids: Vec<_> = session.recent(2).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["c", "d"]);
        assert!(session.recent(0).is_empty());
        assert_eq!(session.recent(10).len(), 4);
    }

    #[test]
    fn test_out_of_order_results_merge() {
        let session = session_with(&["m1"]);
        assert!(session.set_suggestions("m1", vec!["ok".to_string()]));
        assert!(session.set_sentiment("m1", "joy".to_string()));

        let state = session.enrichment("m1").unwrap();
        assert_eq!(state.sentiment_label.as_deref(), Some("joy"));
        assert_eq!(state.suggestions, vec!["ok"]);
        assert_eq!(session.latest_suggestions(), vec!["ok"]);
    }

    #[test]
    fn test_results_after_switch_are_dropped() {
        let session = session_with(&["m1"]);
        session.reset("other-peer", Vec::new());

        assert!(!session.set_sentiment("m1", "joy".to_string()));
        assert!(!session.attach_translation("m1", "hola".to_string()));
        assert!(session.enrichment("m1").is_none());
    }

    #[test]
    fn test_translation_attaches_to_message() {
        let session = session_with(&["m1"]);
        let mut updates = session.subscribe_updates();

        session.attach_translation("m1", "bonjour".to_string());

        assert_eq!(
            session.message("m1").unwrap().translated.as_deref(),
            Some("bonjour")
        );
        assert_eq!(
            updates.try_recv().unwrap(),
            EnrichmentUpdate::Translation {
                message_id: "m1".to_string(),
                text: "bonjour".to_string()
            }
        );
    }

    #[test]
    fn test_append_sent_requires_active_conversation() {
        let session = session_with(&[]);
        assert!(session.append_sent(Message::text("s1", "me", "peer", "hi")));
        assert!(!session.append_sent(Message::text("s2", "me", "someone-else", "hi")));
    }
}
