//! # Delivery chain
//!
//! Runs the delivery handlers for each accepted message: every handler's `before` gate in order
//! (any false stops the chain), then every `handle` in order until one returns Stop.

use async_trait::async_trait;
use chat_core::{Handler, HandlerResponse, Message, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Clone, Default)]
pub struct DeliveryChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl DeliveryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler; handlers run in insertion order.
    pub fn add_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    #[instrument(skip(self, message), fields(message_id = %message.id))]
    pub async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        debug!(sender_id = %message.sender_id, "step: delivery chain started");

        for handler in &self.handlers {
            let handler_name = std::any::type_name_of_val(handler.as_ref());
            if !handler.before(message).await? {
                info!(
                    message_id = %message.id,
                    handler = %handler_name,
                    "step: delivery chain stopped in before"
                );
                return Ok(HandlerResponse::Stop);
            }
        }

        for handler in &self.handlers {
            let handler_name = std::any::type_name_of_val(handler.as_ref());
            let response = handler.handle(message).await?;
            debug!(handler = %handler_name, response = ?response, "step: handler done");
            if response == HandlerResponse::Stop {
                info!(
                    message_id = %message.id,
                    handler = %handler_name,
                    "step: delivery chain stopped by handler"
                );
                return Ok(HandlerResponse::Stop);
            }
        }

        debug!(message_id = %message.id, "step: delivery chain finished");
        Ok(HandlerResponse::Continue)
    }
}

/// Stops messages written by the local user: they are never enriched, answered or notified.
#[derive(Debug, Clone)]
pub struct SelfAuthoredFilter {
    local_user_id: String,
}

impl SelfAuthoredFilter {
    pub fn new(local_user_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
        }
    }
}

#[async_trait]
impl Handler for SelfAuthoredFilter {
    async fn before(&self, message: &Message) -> Result<bool> {
        Ok(!message.is_authored_by(&self.local_user_id))
    }
}
