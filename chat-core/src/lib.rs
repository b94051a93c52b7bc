//! # chat-core
//!
//! Core types and traits for the chat client: [`Message`], the [`Transport`] collaborator with its
//! scoped [`Subscription`], the delivery [`Handler`] trait, the [`ChatError`] taxonomy and tracing
//! initialization. Transport-agnostic; used by annotation-client, enrichment and chat-cli.

pub mod error;
pub mod local;
pub mod logger;
pub mod transport;
pub mod types;

pub use error::{ChatError, Result};
pub use local::LocalTransport;
pub use logger::init_tracing;
pub use transport::{Subscription, Transport};
pub use types::{Handler, HandlerResponse, Message, OutgoingMessage, Persona};
