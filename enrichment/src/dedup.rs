use async_trait::async_trait;
use chat_core::{Handler, Message, Result};
use std::sync::Mutex;
use tracing::debug;

/// Suppresses re-processing of the message that was processed last.
///
/// Holds a single cursor: the id of the last message handed to enrichment. A message whose id
/// equals the cursor is rejected; any other id is accepted and becomes the new cursor. This
/// catches re-triggers of the newest message; it does not remember older ids.
#[derive(Debug, Default)]
pub struct DedupGuard {
    last_analyzed_id: Mutex<Option<String>>,
}

impl DedupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and advances the cursor if `message` was not the last processed one.
    /// Check and update happen under one lock, so two racing calls for the same id cannot both
    /// pass.
    pub fn should_process(&self, message: &Message) -> bool {
        let mut last = self
            .last_analyzed_id
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if last.as_deref() == Some(message.id.as_str()) {
            return false;
        }
        *last = Some(message.id.clone());
        true
    }

    pub fn last_analyzed_id(&self) -> Option<String> {
        self.last_analyzed_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Handler for DedupGuard {
    async fn before(&self, message: &Message) -> Result<bool> {
        let accepted = self.should_process(message);
        if !accepted {
            debug!(message_id = %message.id, "step: dedup guard rejected repeat");
        }
        Ok(accepted)
    }
}
