//! Per-session conversational state for Parley.

pub mod context;
pub mod error;

pub use context::{ContextDelta, ContextManager, ContextState, ConversationContext};
pub use error::DialogError;
