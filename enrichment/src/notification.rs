//! # Notifications
//!
//! Alerts the user about remote messages through a [`Notifier`] (system notification plus
//! sound). Activating a notification asks the autopilot, over its event channel, to take over
//! and reply to that message.

use crate::autopilot::AutopilotEvent;
use async_trait::async_trait;
use chat_core::{Handler, HandlerResponse, Message, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

pub const DEFAULT_ICON: &str = "/avatar.png";
pub const DEFAULT_PEER_NAME: &str = "New User";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// Not asked yet; treated like Denied.
    Default,
}

/// Platform notification surface.
pub trait Notifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;
    /// Plays the alert sound. Failures are ignored by the bridge.
    fn play_alert(&self) -> anyhow::Result<()>;
    fn display(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Hands a message to the autopilot when the user activates its notification.
#[derive(Debug, Clone)]
pub struct Activation {
    message: Message,
    events: UnboundedSender<AutopilotEvent>,
}

impl Activation {
    /// Enables autopilot and requests a reply to the notified message. Returns false if the
    /// autopilot listener is gone.
    pub fn activate(&self) -> bool {
        debug!(message_id = %self.message.id, "step: notification activated");
        self.events
            .send(AutopilotEvent::Activate(self.message.clone()))
            .is_ok()
    }

    pub fn message(&self) -> &Message {
        &self.message
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub icon: String,
    pub activation: Activation,
}

impl Notification {
    pub fn message_id(&self) -> &str {
        &self.activation.message.id
    }
}

pub struct NotificationBridge {
    notifier: Arc<dyn Notifier>,
    events: UnboundedSender<AutopilotEvent>,
    local_user_id: String,
    peer_name: RwLock<String>,
    focused: AtomicBool,
}

impl NotificationBridge {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        events: UnboundedSender<AutopilotEvent>,
        local_user_id: impl Into<String>,
    ) -> Self {
        Self {
            notifier,
            events,
            local_user_id: local_user_id.into(),
            peer_name: RwLock::new(DEFAULT_PEER_NAME.to_string()),
            focused: AtomicBool::new(false),
        }
    }

    /// Display name used in titles; empty falls back to "New User".
    pub fn set_peer_name(&self, name: Option<&str>) {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_PEER_NAME);
        *self.peer_name.write().unwrap_or_else(|e| e.into_inner()) = name.to_string();
    }

    /// While the conversation is focused no alerts are raised.
    pub fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::SeqCst);
    }

    pub fn title_for(&self, message: &Message) -> String {
        let name = self
            .peer_name
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match message.text.as_deref() {
            Some(text) if !text.trim().is_empty() => format!("{} says: {}", name, text),
            _ if message.image.is_some() => format!("{} sent an image", name),
            _ => format!("{} says: ", name),
        }
    }

    /// Alerts about `message`. Returns true if a notification was displayed.
    pub fn notify(&self, message: &Message) -> bool {
        if message.is_authored_by(&self.local_user_id) {
            return false;
        }
        if self.focused.load(Ordering::SeqCst) {
            debug!(message_id = %message.id, "step: conversation focused, no alert");
            return false;
        }
        if self.notifier.permission() != NotificationPermission::Granted {
            debug!(message_id = %message.id, "step: notifications not permitted");
            return false;
        }

        if let Err(e) = self.notifier.play_alert() {
            debug!(error = %e, "Alert sound failed");
        }

        let notification = Notification {
            title: self.title_for(message),
            icon: DEFAULT_ICON.to_string(),
            activation: Activation {
                message: message.clone(),
                events: self.events.clone(),
            },
        };
        match self.notifier.display(notification) {
            Ok(()) => true,
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "Notification display failed");
                false
            }
        }
    }
}

#[async_trait]
impl Handler for NotificationBridge {
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        self.notify(message);
        Ok(HandlerResponse::Continue)
    }
}
