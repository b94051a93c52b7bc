//! One-shot annotation commands. Each returns the text to print.

use annotation_client::AnnotationClient;
use anyhow::{Context, Result};
use chat_core::Persona;
use enrichment::{normalize_suggestions, InsightResult};

pub async fn analyze(client: &dyn AnnotationClient, text: &str) -> Result<String> {
    let label = client
        .analyze_sentiment(text)
        .await
        .context("Sentiment analysis failed")?;
    Ok(label)
}

pub async fn suggest(client: &dyn AnnotationClient, text: &str) -> Result<String> {
    let raw = client
        .suggest_replies(text)
        .await
        .context("Reply suggestions failed")?;
    let suggestions = normalize_suggestions(raw);
    if suggestions.is_empty() {
        return Ok("(no suggestions)".to_string());
    }
    Ok(suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n"))
}

pub async fn complete(client: &dyn AnnotationClient, prompt: &str) -> Result<String> {
    if prompt.trim().is_empty() {
        anyhow::bail!("Enter a prompt first");
    }
    let completed = client.complete_message(prompt).await?;
    Ok(completed.trim().to_string())
}

pub async fn translate(client: &dyn AnnotationClient, text: &str, to: &str) -> Result<String> {
    Ok(client.translate(text, to).await?)
}

/// Non-blank input lines, in order.
pub fn read_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn insight(client: &dyn AnnotationClient, lines: &[String]) -> Result<String> {
    let report = client
        .conversation_insight(lines)
        .await
        .context("Conversation insight failed")?;
    Ok(format_insight(&report))
}

pub fn format_insight(report: &InsightResult) -> String {
    let mut out = format!(
        "Summary: {}",
        report.summary.as_deref().unwrap_or("(none)")
    );
    if let Some(distribution) = &report.sentiment_distribution {
        out.push_str("\nSentiment:");
        for (label, share) in distribution {
            out.push_str(&format!("\n  {:<12} {:>5.1}%", label, share));
        }
    }
    out
}

pub async fn search(
    client: &dyn AnnotationClient,
    query: &str,
    history: &[String],
    persona: Persona,
) -> Result<String> {
    if query.trim().is_empty() {
        return Ok("(no results)".to_string());
    }
    let results = client
        .smart_search(query.trim(), history, persona)
        .await
        .context("Smart search failed")?;
    if results.is_empty() {
        return Ok("(no results)".to_string());
    }
    Ok(results.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_read_lines_skips_blank() {
        assert_eq!(
            read_lines("You: hi\n\n  Other: hey  \n"),
            vec!["You: hi", "Other: hey"]
        );
    }

    #[test]
    fn test_format_insight() {
        let mut distribution = BTreeMap::new();
        distribution.insert("joy".to_string(), 75.0);
        distribution.insert("sadness".to_string(), 25.0);
        let report = InsightResult {
            summary: Some("Upbeat chat.".to_string()),
            sentiment_distribution: Some(distribution),
        };

        let out = format_insight(&report);

        assert!(out.starts_with("Summary: Upbeat chat."));
        assert!(out.contains("joy"));
        assert!(out.contains("75.0%"));
        assert_eq!(format_insight(&InsightResult::default()), "Summary: (none)");
    }
}
