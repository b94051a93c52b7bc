//! Concurrent annotation fan-out for one delivered message.
//!
//! Sentiment, suggestions and (when a preferred language is set) translation run as separate
//! tasks. Each result is merged into [`SessionState`] as soon as it arrives; a failure of one
//! never cancels or delays the others, and no failure reaches the delivery path.

use crate::session::SessionState;
use annotation_client::AnnotationClient;
use async_trait::async_trait;
use chat_core::{Handler, HandlerResponse, Message, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// Maximum number of suggestions kept per message.
pub const MAX_SUGGESTIONS: usize = 3;

/// Trims each suggestion, drops empty ones and repeats (first occurrence wins, order kept),
/// and keeps at most [`MAX_SUGGESTIONS`].
pub fn normalize_suggestions(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Tasks spawned for one message. Dropping the handle does not cancel them.
#[derive(Debug, Default)]
pub struct DispatchHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl DispatchHandle {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits until every spawned task has finished.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "enrichment task aborted");
            }
        }
    }
}

#[derive(Clone)]
pub struct EnrichmentDispatcher {
    client: Arc<dyn AnnotationClient>,
    session: Arc<SessionState>,
    preferred_language: Option<String>,
}

impl EnrichmentDispatcher {
    pub fn new(
        client: Arc<dyn AnnotationClient>,
        session: Arc<SessionState>,
        preferred_language: Option<String>,
    ) -> Self {
        Self {
            client,
            session,
            preferred_language: preferred_language.filter(|lang| !lang.trim().is_empty()),
        }
    }

    pub fn preferred_language(&self) -> Option<&str> {
        self.preferred_language.as_deref()
    }

    /// Spawns the annotation calls for `message` and returns without waiting for them.
    /// Messages without text have nothing to annotate.
    #[instrument(skip(self, message), fields(message_id = %message.id))]
    pub fn dispatch(&self, message: &Message) -> DispatchHandle {
        let text = message.text_or_empty().to_string();
        if text.trim().is_empty() {
            debug!(message_id = %message.id, "step: no text to enrich");
            return DispatchHandle::default();
        }

        let mut tasks = vec![
            tokio::spawn(run_sentiment(
                self.client.clone(),
                self.session.clone(),
                message.id.clone(),
                text.clone(),
            )),
            tokio::spawn(run_suggestions(
                self.client.clone(),
                self.session.clone(),
                message.id.clone(),
                text.clone(),
            )),
        ];
        if let Some(language) = &self.preferred_language {
            tasks.push(tokio::spawn(run_translation(
                self.client.clone(),
                self.session.clone(),
                message.id.clone(),
                text,
                language.clone(),
            )));
        }

        debug!(message_id = %message.id, tasks = tasks.len(), "step: enrichment dispatched");
        DispatchHandle { tasks }
    }
}

async fn run_sentiment(
    client: Arc<dyn AnnotationClient>,
    session: Arc<SessionState>,
    message_id: String,
    text: String,
) {
    match client.analyze_sentiment(&text).await {
        Ok(label) => {
            debug!(message_id = %message_id, label = %label, "step: sentiment merged");
            session.set_sentiment(&message_id, label);
        }
        Err(e) => warn!(message_id = %message_id, error = %e, "Sentiment analysis failed"),
    }
}

async fn run_suggestions(
    client: Arc<dyn AnnotationClient>,
    session: Arc<SessionState>,
    message_id: String,
    text: String,
) {
    match client.suggest_replies(&text).await {
        Ok(raw) => {
            let suggestions = normalize_suggestions(raw);
            debug!(
                message_id = %message_id,
                count = suggestions.len(),
                "step: suggestions merged"
            );
            session.set_suggestions(&message_id, suggestions);
        }
        Err(e) => warn!(message_id = %message_id, error = %e, "Reply suggestions failed"),
    }
}

async fn run_translation(
    client: Arc<dyn AnnotationClient>,
    session: Arc<SessionState>,
    message_id: String,
    text: String,
    language: String,
) {
    match client.translate(&text, &language).await {
        Ok(translated) => {
            debug!(message_id = %message_id, language = %language, "step: translation attached");
            session.attach_translation(&message_id, translated);
        }
        Err(e) => warn!(
            message_id = %message_id,
            language = %language,
            error = %e,
            "Translation failed"
        ),
    }
}

#[async_trait]
impl Handler for EnrichmentDispatcher {
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        // Tasks keep running after the handle is dropped.
        drop(self.dispatch(message));
        Ok(HandlerResponse::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_dedupes_and_caps() {
        let raw = strings(&["go", "go ", "stop", "stop", "wait", "more"]);
        assert_eq!(normalize_suggestions(raw), strings(&["go", "stop", "wait"]));
    }

    #[test]
    fn test_normalize_drops_blank_entries() {
        let raw = strings(&["  ", "", " sure ", "later"]);
        assert_eq!(normalize_suggestions(raw), strings(&["sure", "later"]));
    }

    #[test]
    fn test_normalize_empty() {
        assert!(normalize_suggestions(Vec::new()).is_empty());
    }
}
