//! Conversation insight over a recent window of the message log.

use annotation_client::AnnotationClient;
use chat_core::{ChatError, Message, Result};
use std::sync::{Arc, RwLock};
use tracing::{info, instrument, warn};

pub use annotation_client::InsightReport as InsightResult;

/// Renders messages as `You: <text>` / `Other: <text>` lines, oldest first. Image-only messages
/// render with empty text.
pub fn render_lines(messages: &[Message], local_user_id: &str) -> Vec<String> {
    messages
        .iter()
        .map(|m| {
            let speaker = if m.is_authored_by(local_user_id) {
                "You"
            } else {
                "Other"
            };
            format!("{}: {}", speaker, m.text_or_empty())
        })
        .collect()
}

/// Requests summary and sentiment breakdown for the last `limit` messages and keeps the most
/// recent result.
pub struct InsightAggregator {
    client: Arc<dyn AnnotationClient>,
    local_user_id: String,
    latest: RwLock<Option<InsightResult>>,
}

impl InsightAggregator {
    pub fn new(client: Arc<dyn AnnotationClient>, local_user_id: impl Into<String>) -> Self {
        Self {
            client,
            local_user_id: local_user_id.into(),
            latest: RwLock::new(None),
        }
    }

    /// Sends the last `limit` of `messages` as rendered lines. On success the result replaces
    /// any previous one wholesale; on failure the previous result is kept.
    #[instrument(skip(self, messages), fields(messages = messages.len()))]
    pub async fn request_insight(&self, messages: &[Message], limit: usize) -> Result<InsightResult> {
        let start = messages.len().saturating_sub(limit);
        let lines = render_lines(&messages[start..], &self.local_user_id);
        if lines.is_empty() {
            return Err(ChatError::Validation("No messages provided".to_string()));
        }

        let result = self.client.conversation_insight(&lines).await?;
        if let Some(distribution) = &result.sentiment_distribution {
            let total: f64 = distribution.values().sum();
            if total > 100.0 + f64::EPSILON {
                warn!(total, "Sentiment distribution exceeds 100");
            }
        }
        info!(lines = lines.len(), "step: insight updated");

        *self.latest.write().unwrap_or_else(|e| e.into_inner()) = Some(result.clone());
        Ok(result)
    }

    pub fn latest(&self) -> Option<InsightResult> {
        self.latest
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
