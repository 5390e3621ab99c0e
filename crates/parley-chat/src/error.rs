//! Error types for the turn pipeline.

use parley_core::{InputError, ParleyError};

/// Errors surfaced to the caller of a turn.
///
/// Everything that goes wrong after input validation degrades to a
/// response instead.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("pipeline setup failed: {0}")]
    Setup(String),
}

impl From<ParleyError> for ChatError {
    fn from(err: ParleyError) -> Self {
        match err {
            ParleyError::Input(input) => ChatError::Input(input),
            other => ChatError::Setup(other.to_string()),
        }
    }
}

impl From<ChatError> for ParleyError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Input(input) => ParleyError::Input(input),
            ChatError::Setup(reason) => ParleyError::Config(reason),
        }
    }
}
