//! User-initiated sends: plain text, AI completion of a prompt, and suggestion prefill.
//!
//! Unlike background enrichment, these return their errors to the caller.

use crate::session::SessionState;
use annotation_client::AnnotationClient;
use chat_core::{ChatError, Message, OutgoingMessage, Result, Transport};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct MessageComposer {
    client: Arc<dyn AnnotationClient>,
    transport: Arc<dyn Transport>,
    session: Arc<SessionState>,
}

impl MessageComposer {
    pub fn new(
        client: Arc<dyn AnnotationClient>,
        transport: Arc<dyn Transport>,
        session: Arc<SessionState>,
    ) -> Self {
        Self {
            client,
            transport,
            session,
        }
    }

    fn active_conversation(&self) -> Result<String> {
        self.session
            .conversation_id()
            .ok_or_else(|| ChatError::Validation("No conversation selected".to_string()))
    }

    /// Sends trimmed `text` and/or `image` to the active conversation.
    #[instrument(skip(self, text, image))]
    pub async fn send_text(&self, text: &str, image: Option<String>) -> Result<Message> {
        let text = text.trim();
        let outgoing = OutgoingMessage {
            text: (!text.is_empty()).then(|| text.to_string()),
            image,
        };
        if outgoing.is_empty() {
            return Err(ChatError::Validation("Message is empty".to_string()));
        }
        let conversation_id = self.active_conversation()?;

        let sent = self.transport.send(&conversation_id, outgoing).await?;
        self.session.append_sent(sent.clone());
        info!(conversation_id = %conversation_id, message_id = %sent.id, "step: message sent");
        Ok(sent)
    }

    /// Completes `prompt` with the annotation service and sends the trimmed completion.
    #[instrument(skip(self, prompt))]
    pub async fn compose_with_ai(&self, prompt: &str) -> Result<Message> {
        if prompt.trim().is_empty() {
            return Err(ChatError::Validation("Enter a prompt first".to_string()));
        }
        self.active_conversation()?;

        let completed = self.client.complete_message(prompt).await?;
        let completed = completed.trim();
        if completed.is_empty() {
            return Err(ChatError::EmptyResponse("complete".to_string()));
        }
        self.send_text(completed, None).await
    }

    /// Text of suggestion `index` from the latest suggestion set, for prefilling the input.
    pub fn apply_suggestion(&self, index: usize) -> Option<String> {
        self.session.latest_suggestions().into_iter().nth(index)
    }
}
