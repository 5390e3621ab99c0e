//! Turn orchestration for Parley.
//!
//! The [`Orchestrator`] takes one utterance for one session and runs it
//! through language resolution, analysis, entity extraction and merging,
//! intent classification and skill dispatch, then commits the resulting
//! context delta and logs the turn.

pub mod error;
pub mod orchestrator;
pub mod response;

pub use error::ChatError;
pub use orchestrator::{Orchestrator, TurnResponse};
