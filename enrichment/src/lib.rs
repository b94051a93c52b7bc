//! # Enrichment orchestrator
//!
//! Sits between the message transport and the UI. For every remote message it runs, without
//! blocking delivery: the self-authorship filter, the [`DedupGuard`], a concurrent annotation
//! fan-out ([`EnrichmentDispatcher`]), the [`AutoReplyController`] and the
//! [`NotificationBridge`]. [`MessageStreamSubscriber`] owns the subscription and drives the
//! [`DeliveryChain`]; [`InsightAggregator`], [`SmartSearch`] and [`MessageComposer`] serve the
//! on-demand user actions.

pub mod autopilot;
pub mod chain;
pub mod compose;
pub mod config;
pub mod dedup;
pub mod dispatcher;
pub mod insight;
pub mod notification;
pub mod search;
pub mod session;
pub mod subscriber;

pub use autopilot::{AutoReplyController, AutopilotEvent, AutopilotPhase};
pub use chain::{DeliveryChain, SelfAuthoredFilter};
pub use compose::MessageComposer;
pub use config::EnrichConfig;
pub use dedup::DedupGuard;
pub use dispatcher::{normalize_suggestions, DispatchHandle, EnrichmentDispatcher, MAX_SUGGESTIONS};
pub use insight::{render_lines, InsightAggregator, InsightResult};
pub use notification::{
    Activation, Notification, NotificationBridge, NotificationPermission, Notifier,
};
pub use search::SmartSearch;
pub use session::{EnrichmentState, EnrichmentUpdate, SessionState};
pub use subscriber::{DeliveryOutcome, MessageStreamSubscriber};
