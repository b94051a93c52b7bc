//! Wire payloads of the annotation service.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub(crate) struct TextRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PromptRequest<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct InsightRequest<'a> {
    pub messages: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct AutoReplyRequest<'a> {
    pub message: &'a str,
    pub context: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct TranslateRequest<'a> {
    pub text: &'a str,
    pub to: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SmartSearchRequest<'a> {
    pub query: &'a str,
    pub history: &'a [String],
    pub persona: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SuggestResponse {
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompleteResponse {
    #[serde(default)]
    pub completed: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AutoReplyResponse {
    #[serde(default)]
    pub reply: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TranslateResponse {
    #[serde(default)]
    pub translated_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SmartSearchResponse {
    #[serde(default)]
    pub results: Vec<String>,
}

/// Result of the insight operation. Fields the service omitted stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightReport {
    #[serde(default)]
    pub summary: Option<String>,
    /// Label -> percentage.
    #[serde(default)]
    pub sentiment_distribution: Option<BTreeMap<String, f64>>,
}

/// Extracts the label from an analyze payload: either `[{"label": ..}, ..]` (first entry) or
/// `{"label": ..}`. Returns `None` for any other shape or a blank label.
pub fn parse_sentiment_label(payload: &Value) -> Option<String> {
    let entry = match payload {
        Value::Array(items) => items.first()?,
        Value::Object(_) => payload,
        _ => return None,
    };
    entry
        .get("label")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}
