//! # Message stream subscriber
//!
//! Owns the live subscription of the selected conversation and runs every delivery through the
//! [`DeliveryChain`]: self filter, dedup guard, enrichment fan-out, autopilot, notification.
//! Switching or tearing down the conversation releases the subscription before anything else
//! happens.

use crate::autopilot::{AutoReplyController, AutopilotEvent};
use crate::chain::{DeliveryChain, SelfAuthoredFilter};
use crate::compose::MessageComposer;
use crate::config::EnrichConfig;
use crate::dedup::DedupGuard;
use crate::dispatcher::EnrichmentDispatcher;
use crate::insight::{InsightAggregator, InsightResult};
use crate::notification::{NotificationBridge, Notifier};
use crate::search::SmartSearch;
use crate::session::SessionState;
use annotation_client::AnnotationClient;
use chat_core::{HandlerResponse, Message, Persona, Result, Subscription, Transport};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// What happened to one delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Not part of the active conversation; ignored.
    Foreign,
    /// Already delivered live in this session; not processed again.
    AlreadySeen,
    /// Logged, but a chain step stopped it (self-authored or repeat).
    Stopped,
    /// Logged and handed to enrichment, autopilot and notification.
    Processed,
}

struct Pipeline {
    session: Arc<SessionState>,
    chain: DeliveryChain,
    local_user_id: String,
    /// Ids that went through the chain. Distinct from the log, which also holds fetched history
    /// and local sends.
    delivered: Mutex<HashSet<String>>,
}

impl Pipeline {
    fn belongs_to(&self, conversation_id: &str, message: &Message) -> bool {
        message.sender_id == conversation_id
            || (message.is_authored_by(&self.local_user_id)
                && message.receiver_id == conversation_id)
    }

    fn mark_delivered(&self, message_id: &str) -> bool {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(message_id.to_string())
    }

    fn forget_delivered(&self) {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    async fn deliver(&self, conversation_id: &str, message: Message) -> Result<DeliveryOutcome> {
        if !self.belongs_to(conversation_id, &message) {
            debug!(
                message_id = %message.id,
                sender_id = %message.sender_id,
                conversation_id = %conversation_id,
                "step: foreign message ignored"
            );
            return Ok(DeliveryOutcome::Foreign);
        }
        if !self.mark_delivered(&message.id) {
            debug!(message_id = %message.id, "step: message already delivered");
            return Ok(DeliveryOutcome::AlreadySeen);
        }
        // False when history or a local send already logged it; the chain still runs once.
        if !self.session.append(message.clone()) {
            debug!(message_id = %message.id, "step: live delivery of logged message");
        }
        match self.chain.handle(&message).await? {
            HandlerResponse::Continue => Ok(DeliveryOutcome::Processed),
            HandlerResponse::Stop => Ok(DeliveryOutcome::Stopped),
        }
    }
}

struct ActiveConversation {
    conversation_id: String,
    pump: JoinHandle<()>,
}

async fn pump(pipeline: Arc<Pipeline>, mut subscription: Subscription) {
    let conversation_id = subscription.conversation_id().to_string();
    while let Some(message) = subscription.recv().await {
        let message_id = message.id.clone();
        match pipeline.deliver(&conversation_id, message).await {
            Ok(outcome) => debug!(message_id = %message_id, outcome = ?outcome, "step: delivery handled"),
            Err(e) => error!(message_id = %message_id, error = %e, "Delivery handling failed"),
        }
    }
    info!(conversation_id = %conversation_id, "step: subscription closed by transport");
}

pub struct MessageStreamSubscriber {
    transport: Arc<dyn Transport>,
    pipeline: Arc<Pipeline>,
    guard: Arc<DedupGuard>,
    autopilot: AutoReplyController,
    notifications: Option<Arc<NotificationBridge>>,
    insight: InsightAggregator,
    search: SmartSearch,
    composer: MessageComposer,
    events: UnboundedSender<AutopilotEvent>,
    insight_window: usize,
    active: Mutex<Option<ActiveConversation>>,
    listener: JoinHandle<()>,
}

impl MessageStreamSubscriber {
    /// Wires the orchestrator and starts the autopilot event listener. Must be called within a
    /// Tokio runtime.
    pub fn new(
        config: &EnrichConfig,
        client: Arc<dyn AnnotationClient>,
        transport: Arc<dyn Transport>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let local_user_id = config.local_user_id.clone();
        let session = Arc::new(SessionState::new());
        let (events, events_rx) = mpsc::unbounded_channel();

        let guard = Arc::new(DedupGuard::new());
        let dispatcher = Arc::new(EnrichmentDispatcher::new(
            client.clone(),
            session.clone(),
            config.preferred_language.clone(),
        ));
        let autopilot = AutoReplyController::new(
            client.clone(),
            transport.clone(),
            session.clone(),
            local_user_id.clone(),
            config.autopilot_delay,
        );
        autopilot.set_context_limit(config.autopilot_context_limit);
        autopilot.set_enabled(config.autopilot_enabled);
        let notifications = notifier.map(|notifier| {
            Arc::new(NotificationBridge::new(
                notifier,
                events.clone(),
                local_user_id.clone(),
            ))
        });

        let mut chain = DeliveryChain::new()
            .add_handler(Arc::new(SelfAuthoredFilter::new(local_user_id.clone())))
            .add_handler(guard.clone())
            .add_handler(dispatcher)
            .add_handler(Arc::new(autopilot.clone()));
        if let Some(bridge) = &notifications {
            chain = chain.add_handler(bridge.clone());
        }

        let listener = tokio::spawn(autopilot.clone().listen(events_rx));
        info!(
            local_user_id = %local_user_id,
            handlers = chain.len(),
            translation = config.preferred_language.is_some(),
            autopilot = config.autopilot_enabled,
            "step: subscriber ready"
        );

        Self {
            insight: InsightAggregator::new(client.clone(), local_user_id.clone()),
            search: SmartSearch::new(client.clone()),
            composer: MessageComposer::new(client, transport.clone(), session.clone()),
            pipeline: Arc::new(Pipeline {
                session,
                chain,
                local_user_id,
                delivered: Mutex::new(HashSet::new()),
            }),
            transport,
            guard,
            autopilot,
            notifications,
            events,
            insight_window: config.insight_window,
            active: Mutex::new(None),
            listener,
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveConversation>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes `conversation_id` the active conversation: releases the previous subscription,
    /// subscribes, loads history into a fresh session and starts live delivery.
    #[instrument(skip(self, peer_name))]
    pub async fn select_conversation(
        &self,
        conversation_id: &str,
        peer_name: Option<&str>,
    ) -> Result<()> {
        self.teardown();

        let subscription = self.transport.subscribe(conversation_id).await?;
        // On error the subscription is dropped here, which releases it.
        let history = self.transport.fetch_history(conversation_id).await?;
        self.pipeline.session.reset(conversation_id, history);
        self.pipeline.forget_delivered();
        if let Some(bridge) = &self.notifications {
            bridge.set_peer_name(peer_name);
        }

        let pump = tokio::spawn(pump(self.pipeline.clone(), subscription));
        let previous = self.active().replace(ActiveConversation {
            conversation_id: conversation_id.to_string(),
            pump,
        });
        if let Some(previous) = previous {
            self.release(previous);
        }
        info!(conversation_id = %conversation_id, "step: conversation selected");
        Ok(())
    }

    /// Releases the active subscription, if any, and clears the session.
    pub fn teardown(&self) {
        let active = self.active().take();
        if let Some(active) = active {
            info!(conversation_id = %active.conversation_id, "step: conversation torn down");
            self.release(active);
            self.pipeline.session.clear();
            self.pipeline.forget_delivered();
        }
    }

    fn release(&self, active: ActiveConversation) {
        active.pump.abort();
        self.transport.unsubscribe(&active.conversation_id);
    }

    pub fn active_conversation(&self) -> Option<String> {
        self.active().as_ref().map(|a| a.conversation_id.clone())
    }

    /// Runs one message through the pipeline as if the transport had delivered it.
    pub async fn deliver(&self, message: Message) -> Result<DeliveryOutcome> {
        let Some(conversation_id) = self.active_conversation() else {
            return Ok(DeliveryOutcome::Foreign);
        };
        self.pipeline.deliver(&conversation_id, message).await
    }

    /// Re-runs the chain for the newest logged message, as a re-render of the message view
    /// would. The dedup guard stops it if that message was already processed.
    pub async fn retrigger_latest(&self) -> Result<HandlerResponse> {
        match self.pipeline.session.last_message() {
            Some(message) => self.pipeline.chain.handle(&message).await,
            None => Ok(HandlerResponse::Continue),
        }
    }

    /// Insight over the configured window of the active conversation.
    pub async fn show_insight(&self) -> Result<InsightResult> {
        let messages = self.pipeline.session.messages();
        self.insight
            .request_insight(&messages, self.insight_window)
            .await
    }

    pub async fn search(&self, query: &str, persona: Persona) -> Vec<String> {
        let messages = self.pipeline.session.messages();
        self.search.search(query, &messages, persona).await
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.pipeline.session
    }

    pub fn dedup_guard(&self) -> &DedupGuard {
        &self.guard
    }

    pub fn autopilot(&self) -> &AutoReplyController {
        &self.autopilot
    }

    pub fn composer(&self) -> &MessageComposer {
        &self.composer
    }

    pub fn insight(&self) -> &InsightAggregator {
        &self.insight
    }

    pub fn notifications(&self) -> Option<&Arc<NotificationBridge>> {
        self.notifications.as_ref()
    }

    /// Sender for autopilot commands (enable, disable, activate).
    pub fn autopilot_events(&self) -> UnboundedSender<AutopilotEvent> {
        self.events.clone()
    }
}

impl Drop for MessageStreamSubscriber {
    fn drop(&mut self) {
        self.teardown();
        self.listener.abort();
    }
}
