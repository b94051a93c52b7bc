use thiserror::Error;

/// Errors shared by every layer of the chat client.
///
/// Enrichment code logs `Service` / `EmptyResponse` and moves on; only explicit user actions
/// (manual send, AI compose, auto-reply send) hand errors back to their caller.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Service error: {0}")]
    Service(String),

    #[error("AI returned empty response: {0}")]
    EmptyResponse(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// True for failures of the remote annotation service (including empty completions).
    pub fn is_service(&self) -> bool {
        matches!(self, ChatError::Service(_) | ChatError::EmptyResponse(_))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
