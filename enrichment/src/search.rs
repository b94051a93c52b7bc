use annotation_client::AnnotationClient;
use chat_core::{Message, Persona};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Persona-voiced search over the conversation history.
#[derive(Clone)]
pub struct SmartSearch {
    client: Arc<dyn AnnotationClient>,
}

impl SmartSearch {
    pub fn new(client: Arc<dyn AnnotationClient>) -> Self {
        Self { client }
    }

    /// Searches the text of `history` for `query`. A blank query or a remote failure yields
    /// no results.
    #[instrument(skip(self, history), fields(history = history.len(), persona = %persona))]
    pub async fn search(&self, query: &str, history: &[Message], persona: Persona) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let texts: Vec<String> = history
            .iter()
            .map(|m| m.text_or_empty().to_string())
            .collect();
        match self.client.smart_search(query, &texts, persona).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Smart search failed");
                Vec::new()
            }
        }
    }
}
