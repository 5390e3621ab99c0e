use thiserror::Error;

/// Top-level error type for the Parley system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for ParleyError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    #[error("Invalid language code: {0:?}")]
    InvalidLanguage(String),

    #[error("NLU error: {0}")]
    Nlu(String),

    #[error("Dialog error: {0}")]
    Dialog(String),

    #[error("Skill error: {0}")]
    Skill(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Rejections raised before an utterance enters the pipeline.
///
/// This is the only error kind that is surfaced to callers of a turn; every
/// other failure degrades to a best-effort response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("utterance is empty")]
    Empty,
    #[error("utterance exceeds maximum length of {0} characters")]
    TooLong(usize),
    #[error("session id is empty")]
    EmptySession,
}

impl From<toml::de::Error> for ParleyError {
    fn from(err: toml::de::Error) -> Self {
        ParleyError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ParleyError {
    fn from(err: toml::ser::Error) -> Self {
        ParleyError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ParleyError {
    fn from(err: serde_json::Error) -> Self {
        ParleyError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Parley operations.
pub type Result<T> = std::result::Result<T, ParleyError>;
