use crate::types::{Round, SessionId};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Session not found: {id}")]
    SessionNotFound { id: SessionId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A text-generation backend failure. Fatal to the turn attempt:
    /// no partial turn is persisted and the caller may retry the same choice.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// An image backend failure. Never fatal to a turn; recorded on the
    /// session's pending-image slot and surfaced only through polling.
    #[error("Image generation failed for round {round}: {message}")]
    ImageGeneration { round: Round, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
