use parley_core::{Language, ParleyError};
use thiserror::Error;

/// Errors raised inside the NLU components.
///
/// None of these fail a turn: the extractor degrades to no entities and the
/// intent engine degrades to `unknown`.
#[derive(Debug, Error)]
pub enum NluError {
    #[error("No model available for language {language}: {reason}")]
    ModelUnavailable { language: Language, reason: String },

    #[error("Unsupported model identifier: {0}")]
    UnsupportedModel(String),

    #[error("Failed to load model {id}: {reason}")]
    ModelLoad { id: String, reason: String },

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<NluError> for ParleyError {
    fn from(err: NluError) -> Self {
        ParleyError::Nlu(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NluError>;
