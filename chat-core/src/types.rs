//! Core types: message, outgoing message, persona, handler response, and Handler trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single chat message as delivered by the transport.
///
/// Immutable once delivered, except for `translated`, which enrichment may attach afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Image attachment: a URL or a data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated: Option<String>,
}

impl Message {
    /// Builds a text message with a fresh timestamp. Used by transports and tests.
    pub fn text(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            text: Some(text.into()),
            image: None,
            created_at: Utc::now(),
            translated: None,
        }
    }

    /// Returns true if `user_id` wrote this message.
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.sender_id == user_id
    }

    /// Text body, or `""` for image-only messages.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Payload of a send action: text, image, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    /// True when neither a non-blank text nor an image is present.
    pub fn is_empty(&self) -> bool {
        let blank_text = self.text.as_deref().map_or(true, |t| t.trim().is_empty());
        blank_text && self.image.is_none()
    }
}

/// Voice the smart-search service answers in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Persona {
    Therapist,
    #[default]
    Friend,
    #[serde(rename = "Motivational Coach")]
    MotivationalCoach,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Therapist => "Therapist",
            Persona::Friend => "Friend",
            Persona::MotivationalCoach => "Motivational Coach",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Persona {
    type Err = crate::ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], " ").as_str() {
            "therapist" => Ok(Persona::Therapist),
            "friend" => Ok(Persona::Friend),
            "motivational coach" | "coach" => Ok(Persona::MotivationalCoach),
            other => Err(crate::ChatError::Validation(format!(
                "Unknown persona: '{}'. Valid options: therapist, friend, coach",
                other
            ))),
        }
    }
}

/// Handler result for the delivery chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResponse {
    /// Pass to next handler.
    Continue,
    /// Stop the chain.
    Stop,
}

/// One step of the delivery pipeline. The chain runs every `before` in order (any `false` stops
/// it), then `handle` in order until one returns `Stop`.
///
/// Implementations must not await remote work in `handle`; spawn it instead so the next delivery
/// is never held up.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Gate run before the handle phase. Return false to stop the chain.
    async fn before(&self, _message: &Message) -> crate::error::Result<bool> {
        Ok(true)
    }
    /// Processes the message. Default: Continue.
    async fn handle(&self, _message: &Message) -> crate::error::Result<HandlerResponse> {
        Ok(HandlerResponse::Continue)
    }
}
