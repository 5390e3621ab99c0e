//! Error types for the context manager.

use parley_core::ParleyError;

/// Errors from the context manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogError {
    #[error("context corruption: {0}")]
    ContextCorruption(String),
}

impl From<DialogError> for ParleyError {
    fn from(err: DialogError) -> Self {
        ParleyError::Dialog(err.to_string())
    }
}
