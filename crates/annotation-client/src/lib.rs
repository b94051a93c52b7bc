//! # Annotation client
//!
//! Defines the [`AnnotationClient`] trait over the remote AI annotation service and its HTTP
//! implementation [`HttpAnnotationClient`]. Every operation is an independent request/response
//! round-trip with no shared state, so callers may run any number of them concurrently.
//!
//! The orchestrator receives the client as `Arc<dyn AnnotationClient>`, which lets tests swap in
//! a deterministic fake.

use async_trait::async_trait;
use chat_core::{Persona, Result};

mod config;
mod http;
mod payload;

pub use config::EndpointConfig;
pub use http::HttpAnnotationClient;
pub use payload::{parse_sentiment_label, InsightReport};

/// Remote annotation operations.
#[async_trait]
pub trait AnnotationClient: Send + Sync {
    /// Sentiment label for `text`. Empty text or a remote failure is a `Service` error; callers
    /// treat it as "no label".
    async fn analyze_sentiment(&self, text: &str) -> Result<String>;

    /// Reply suggestions as returned by the service. De-duplication and capping are the
    /// caller's job.
    async fn suggest_replies(&self, text: &str) -> Result<Vec<String>>;

    /// Completes `prompt` into a message. An empty completion is `EmptyResponse`.
    async fn complete_message(&self, prompt: &str) -> Result<String>;

    /// Summary and sentiment breakdown over pre-rendered conversation lines. Both fields are
    /// optional; absence means "not computed".
    async fn conversation_insight(&self, lines: &[String]) -> Result<InsightReport>;

    /// Reply to `message` given `context`. `None` means "no reply, do not send".
    async fn generate_auto_reply(&self, message: &str, context: &str) -> Result<Option<String>>;

    /// Translates `text` into `target_language`. Missing text or target is a `Validation`
    /// error raised before any request.
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;

    /// Searches `history` for `query`, answering in the voice of `persona`.
    async fn smart_search(
        &self,
        query: &str,
        history: &[String],
        persona: Persona,
    ) -> Result<Vec<String>>;
}
