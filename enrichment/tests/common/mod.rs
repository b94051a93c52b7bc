//! Shared fakes for the orchestrator tests: an in-process annotation client with call counters,
//! a recording notifier, and message helpers.

#![allow(dead_code)]

use annotation_client::{AnnotationClient, InsightReport};
use async_trait::async_trait;
use chat_core::{ChatError, Message, Persona, Result};
use enrichment::{Notification, NotificationPermission, Notifier};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const ME: &str = "me";
pub const PEER: &str = "peer";

pub fn peer_message(id: &str, text: &str) -> Message {
    Message::text(id, PEER, ME, text)
}

pub fn my_message(id: &str, text: &str) -> Message {
    Message::text(id, ME, PEER, text)
}

/// Polls `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Deterministic annotation client. Every operation counts its calls; results are set per test.
#[derive(Default)]
pub struct FakeAnnotationClient {
    pub sentiment_calls: AtomicUsize,
    pub suggest_calls: AtomicUsize,
    pub complete_calls: AtomicUsize,
    pub insight_calls: AtomicUsize,
    pub auto_reply_calls: AtomicUsize,
    pub translate_calls: AtomicUsize,
    pub search_calls: AtomicUsize,

    pub fail_sentiment: AtomicBool,
    pub fail_insight: AtomicBool,
    pub suggestions: Mutex<Vec<String>>,
    pub completion: Mutex<String>,
    pub auto_reply: Mutex<Option<String>>,
    pub search_results: Mutex<Vec<String>>,

    pub insight_requests: Mutex<Vec<Vec<String>>>,
    pub auto_reply_requests: Mutex<Vec<(String, String)>>,
    pub translate_requests: Mutex<Vec<(String, String)>>,
    pub search_requests: Mutex<Vec<(String, Vec<String>, Persona)>>,
}

impl FakeAnnotationClient {
    pub fn new() -> Self {
        let fake = Self::default();
        *fake.auto_reply.lock().unwrap() = Some("on my way".to_string());
        *fake.completion.lock().unwrap() = "completed text".to_string();
        fake
    }

    pub fn with_suggestions(self, suggestions: &[&str]) -> Self {
        *self.suggestions.lock().unwrap() = suggestions.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_auto_reply(self, reply: Option<&str>) -> Self {
        *self.auto_reply.lock().unwrap() = reply.map(str::to_string);
        self
    }

    pub fn with_completion(self, completion: &str) -> Self {
        *self.completion.lock().unwrap() = completion.to_string();
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnnotationClient for FakeAnnotationClient {
    async fn analyze_sentiment(&self, text: &str) -> Result<String> {
        self.sentiment_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sentiment.load(Ordering::SeqCst) {
            return Err(ChatError::Service("analyze failed (500)".to_string()));
        }
        Ok(if text.contains("love") { "joy" } else { "neutral" }.to_string())
    }

    async fn suggest_replies(&self, _text: &str) -> Result<Vec<String>> {
        self.suggest_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.suggestions.lock().unwrap().clone())
    }

    async fn complete_message(&self, _prompt: &str) -> Result<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.completion.lock().unwrap().clone())
    }

    async fn conversation_insight(&self, lines: &[String]) -> Result<InsightReport> {
        self.insight_calls.fetch_add(1, Ordering::SeqCst);
        self.insight_requests.lock().unwrap().push(lines.to_vec());
        if self.fail_insight.load(Ordering::SeqCst) {
            return Err(ChatError::Service("insight failed (500)".to_string()));
        }
        let mut distribution = BTreeMap::new();
        distribution.insert("joy".to_string(), 60.0);
        distribution.insert("neutral".to_string(), 40.0);
        Ok(InsightReport {
            summary: Some(format!("{} lines", lines.len())),
            sentiment_distribution: Some(distribution),
        })
    }

    async fn generate_auto_reply(&self, message: &str, context: &str) -> Result<Option<String>> {
        self.auto_reply_calls.fetch_add(1, Ordering::SeqCst);
        self.auto_reply_requests
            .lock()
            .unwrap()
            .push((message.to_string(), context.to_string()));
        Ok(self.auto_reply.lock().unwrap().clone())
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        self.translate_requests
            .lock()
            .unwrap()
            .push((text.to_string(), target_language.to_string()));
        Ok(format!("[{}] {}", target_language, text))
    }

    async fn smart_search(
        &self,
        query: &str,
        history: &[String],
        persona: Persona,
    ) -> Result<Vec<String>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search_requests
            .lock()
            .unwrap()
            .push((query.to_string(), history.to_vec(), persona));
        Ok(self.search_results.lock().unwrap().clone())
    }
}

/// Notifier that records what it was asked to display.
pub struct RecordingNotifier {
    pub permission: Mutex<NotificationPermission>,
    pub alerts: AtomicUsize,
    pub fail_sound: AtomicBool,
    pub displayed: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self {
            permission: Mutex::new(permission),
            alerts: AtomicUsize::new(0),
            fail_sound: AtomicBool::new(false),
            displayed: Mutex::new(Vec::new()),
        }
    }

    pub fn titles(&self) -> Vec<String> {
        self.displayed
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.title.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> NotificationPermission {
        *self.permission.lock().unwrap()
    }

    fn play_alert(&self) -> anyhow::Result<()> {
        self.alerts.fetch_add(1, Ordering::SeqCst);
        if self.fail_sound.load(Ordering::SeqCst) {
            anyhow::bail!("audio device unavailable");
        }
        Ok(())
    }

    fn display(&self, notification: Notification) -> anyhow::Result<()> {
        self.displayed.lock().unwrap().push(notification);
        Ok(())
    }
}
