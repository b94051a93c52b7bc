//! # Autopilot
//!
//! Sends a generated reply to remote messages after a fixed delay, at most one at a time.
//!
//! Lifecycle per trigger: `Idle -> Scheduled -> (delay) -> Sending -> Idle`. A trigger that
//! arrives while another reply is scheduled or sending is dropped, not queued. Disabling
//! autopilot during the delay aborts the pending reply before any remote call.

use crate::insight::render_lines;
use crate::session::SessionState;
use annotation_client::AnnotationClient;
use async_trait::async_trait;
use chat_core::{Handler, HandlerResponse, Message, OutgoingMessage, Result, Transport};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, instrument, warn};

const PHASE_IDLE: u8 = 0;
const PHASE_SCHEDULED: u8 = 1;
const PHASE_SENDING: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutopilotPhase {
    Idle,
    Scheduled,
    Sending,
}

impl AutopilotPhase {
    fn from_raw(raw: u8) -> Self {
        match raw {
            PHASE_SCHEDULED => AutopilotPhase::Scheduled,
            PHASE_SENDING => AutopilotPhase::Sending,
            _ => AutopilotPhase::Idle,
        }
    }
}

/// Commands for the controller's listener task.
#[derive(Debug, Clone, PartialEq)]
pub enum AutopilotEvent {
    /// Enable autopilot and reply to this message (sent by notification activation).
    Activate(Message),
    Enable,
    Disable,
}

struct ControllerInner {
    client: Arc<dyn AnnotationClient>,
    transport: Arc<dyn Transport>,
    session: Arc<SessionState>,
    local_user_id: String,
    delay: Duration,
    context_limit: AtomicUsize,
    enabled: AtomicBool,
    phase: AtomicU8,
}

/// Returns the controller to Idle however the reply task ends, including abort.
struct PhaseReset(Arc<ControllerInner>);

impl Drop for PhaseReset {
    fn drop(&mut self) {
        self.0.phase.store(PHASE_IDLE, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct AutoReplyController {
    inner: Arc<ControllerInner>,
}

impl AutoReplyController {
    pub fn new(
        client: Arc<dyn AnnotationClient>,
        transport: Arc<dyn Transport>,
        session: Arc<SessionState>,
        local_user_id: impl Into<String>,
        delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                client,
                transport,
                session,
                local_user_id: local_user_id.into(),
                delay,
                context_limit: AtomicUsize::new(0),
                enabled: AtomicBool::new(false),
                phase: AtomicU8::new(PHASE_IDLE),
            }),
        }
    }

    /// Number of recent log messages rendered into the reply context. 0 sends an empty
    /// context.
    pub fn set_context_limit(&self, limit: usize) {
        self.inner.context_limit.store(limit, Ordering::SeqCst);
    }

    pub fn set_enabled(&self, enabled: bool) {
        let was = self.inner.enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            info!(enabled, "step: autopilot toggled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> AutopilotPhase {
        AutopilotPhase::from_raw(self.inner.phase.load(Ordering::SeqCst))
    }

    /// Schedules a reply to `message`. Returns false, doing nothing, when the message is
    /// self-authored, autopilot is disabled, or a reply is already in flight.
    pub fn trigger(&self, message: &Message) -> bool {
        if message.is_authored_by(&self.inner.local_user_id) {
            return false;
        }
        if !self.is_enabled() {
            return false;
        }
        if self
            .inner
            .phase
            .compare_exchange(PHASE_IDLE, PHASE_SCHEDULED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(message_id = %message.id, "step: auto-reply already in flight, trigger dropped");
            return false;
        }

        info!(
            message_id = %message.id,
            delay_ms = self.inner.delay.as_millis() as u64,
            "step: auto-reply scheduled"
        );
        let reset = PhaseReset(self.inner.clone());
        let controller = self.clone();
        let message = message.clone();
        tokio::spawn(async move {
            let _reset = reset;
            controller.run_scheduled(message).await;
        });
        true
    }

    async fn run_scheduled(&self, message: Message) {
        tokio::time::sleep(self.inner.delay).await;

        if !self.is_enabled() {
            info!(message_id = %message.id, "step: autopilot disabled during delay, reply dropped");
            return;
        }
        self.inner.phase.store(PHASE_SENDING, Ordering::SeqCst);

        match self.reply_now(&message).await {
            Ok(Some(sent)) => {
                info!(message_id = %message.id, reply_id = %sent.id, "step: auto-reply sent")
            }
            Ok(None) => info!(message_id = %message.id, "step: auto-reply empty, nothing sent"),
            Err(e) => error!(message_id = %message.id, error = %e, "Auto-reply failed"),
        }
    }

    /// Generates and sends a reply to `message` right away, bypassing the delay and the
    /// in-flight guard. `Ok(None)` when the service produced no reply.
    #[instrument(skip(self, message), fields(message_id = %message.id))]
    pub async fn reply_now(&self, message: &Message) -> Result<Option<Message>> {
        let context = self.render_context();
        let reply = self
            .inner
            .client
            .generate_auto_reply(message.text_or_empty(), &context)
            .await?;
        let Some(reply) = reply.filter(|r| !r.trim().is_empty()) else {
            return Ok(None);
        };

        let sent = self
            .inner
            .transport
            .send(&message.sender_id, OutgoingMessage::text(reply.trim()))
            .await?;
        self.inner.session.append_sent(sent.clone());
        Ok(Some(sent))
    }

    fn render_context(&self) -> String {
        let limit = self.inner.context_limit.load(Ordering::SeqCst);
        if limit == 0 {
            return String::new();
        }
        let recent = self.inner.session.recent(limit);
        render_lines(&recent, &self.inner.local_user_id).join("\n")
    }

    /// Applies events until every sender is dropped.
    pub async fn listen(self, mut events: UnboundedReceiver<AutopilotEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                AutopilotEvent::Activate(message) => {
                    self.set_enabled(true);
                    if !self.trigger(&message) {
                        warn!(message_id = %message.id, "Activation did not schedule a reply");
                    }
                }
                AutopilotEvent::Enable => self.set_enabled(true),
                AutopilotEvent::Disable => self.set_enabled(false),
            }
        }
        debug!("step: autopilot listener stopped");
    }
}

#[async_trait]
impl Handler for AutoReplyController {
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        if self.is_enabled() {
            self.trigger(message);
        }
        Ok(HandlerResponse::Continue)
    }
}
