//! HTTP implementation of [`AnnotationClient`] on top of reqwest.

use crate::config::EndpointConfig;
use crate::payload::{
    parse_sentiment_label, AutoReplyRequest, AutoReplyResponse, CompleteResponse, InsightReport,
    InsightRequest, PromptRequest, SmartSearchRequest, SmartSearchResponse, SuggestResponse,
    TextRequest, TranslateRequest, TranslateResponse,
};
use crate::AnnotationClient;
use async_trait::async_trait;
use chat_core::{ChatError, Persona, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

const LOG_PREVIEW_LEN: usize = 80;

fn preview(text: &str) -> String {
    if text.chars().count() <= LOG_PREVIEW_LEN {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(LOG_PREVIEW_LEN).collect::<String>())
    }
}

/// Annotation client that POSTs JSON to the configured endpoints.
#[derive(Debug, Clone)]
pub struct HttpAnnotationClient {
    client: Client,
    config: EndpointConfig,
}

impl HttpAnnotationClient {
    /// Creates a client with the configured request timeout.
    pub fn new(config: EndpointConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Creates a client around an existing reqwest client.
    pub fn with_client(client: Client, config: EndpointConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    fn insight_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.insight_base_url, path)
    }

    async fn post<B, R>(&self, operation: &'static str, url: String, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(operation, url = %url, "step: annotation request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ChatError::Service(format!("{} request failed: {}", operation, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChatError::Service(format!(
                "{} failed ({}): {}",
                operation, status, error_text
            )));
        }

        response.json::<R>().await.map_err(|e| {
            ChatError::Service(format!("{} returned malformed payload: {}", operation, e))
        })
    }
}

#[async_trait]
impl AnnotationClient for HttpAnnotationClient {
    #[instrument(skip(self, text))]
    async fn analyze_sentiment(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(ChatError::Service("analyze: empty text".to_string()));
        }
        let payload: Value = self
            .post("analyze", self.url("analyze"), &TextRequest { text })
            .await?;
        let label = parse_sentiment_label(&payload)
            .ok_or_else(|| ChatError::Service(format!("analyze: no label in {}", payload)))?;
        debug!(label = %label, text_preview = %preview(text), "step: sentiment labelled");
        Ok(label)
    }

    #[instrument(skip(self, text))]
    async fn suggest_replies(&self, text: &str) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Err(ChatError::Service("suggest: empty text".to_string()));
        }
        let response: SuggestResponse = self
            .post("suggest", self.url("suggest"), &TextRequest { text })
            .await?;
        Ok(response.suggestions)
    }

    #[instrument(skip(self, prompt))]
    async fn complete_message(&self, prompt: &str) -> Result<String> {
        let response: CompleteResponse = self
            .post("complete", self.url("complete"), &PromptRequest { prompt })
            .await?;
        match response.completed {
            Some(completed) if !completed.trim().is_empty() => Ok(completed),
            _ => Err(ChatError::EmptyResponse("complete".to_string())),
        }
    }

    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    async fn conversation_insight(&self, lines: &[String]) -> Result<InsightReport> {
        if lines.is_empty() {
            return Err(ChatError::Validation("No messages provided".to_string()));
        }
        let report: InsightReport = self
            .post(
                "insight",
                self.insight_url("insight"),
                &InsightRequest { messages: lines },
            )
            .await?;
        info!(
            has_summary = report.summary.is_some(),
            has_distribution = report.sentiment_distribution.is_some(),
            "step: insight received"
        );
        Ok(report)
    }

    #[instrument(skip(self, message, context))]
    async fn generate_auto_reply(&self, message: &str, context: &str) -> Result<Option<String>> {
        let response: AutoReplyResponse = self
            .post(
                "auto-reply",
                self.url("auto-reply"),
                &AutoReplyRequest { message, context },
            )
            .await?;
        Ok(response
            .reply
            .map(|reply| reply.trim().to_string())
            .filter(|reply| !reply.is_empty()))
    }

    #[instrument(skip(self, text))]
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        if text.trim().is_empty() || target_language.trim().is_empty() {
            return Err(ChatError::Validation(
                "Text and target language are required".to_string(),
            ));
        }
        let response: TranslateResponse = self
            .post(
                "translate",
                self.url("translate"),
                &TranslateRequest {
                    text,
                    to: target_language,
                },
            )
            .await?;
        response
            .translated_text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ChatError::Service("translate: no translatedText".to_string()))
    }

    #[instrument(skip(self, history), fields(history = history.len()))]
    async fn smart_search(
        &self,
        query: &str,
        history: &[String],
        persona: Persona,
    ) -> Result<Vec<String>> {
        let response: SmartSearchResponse = self
            .post(
                "smart-search",
                self.insight_url("smart-search"),
                &SmartSearchRequest {
                    query,
                    history,
                    persona: persona.as_str(),
                },
            )
            .await?;
        Ok(response.results)
    }
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(100);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 83);
        assert_eq!(preview("short"), "short");
    }
}
