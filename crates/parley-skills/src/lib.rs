//! Skills: the pluggable handlers a turn is routed to.
//!
//! A [`Skill`] declares the intents it understands, answers a cheap
//! `can_handle` question, and produces a response plus a context delta.
//! The [`SkillRegistry`] holds skills in registration order and the
//! [`Dispatcher`] routes each turn to the first skill that accepts it.

pub mod builtin;
pub mod dispatcher;
pub mod error;
pub mod manifest;
pub mod registry;
pub mod skill;

pub use builtin::forecast::{ForecastProvider, OfflineForecast};
pub use builtin::SkillFactory;
pub use dispatcher::{DispatchResult, Dispatcher};
pub use error::SkillError;
pub use manifest::SkillManifest;
pub use registry::SkillRegistry;
pub use skill::{Skill, SkillDescriptor, SkillOutcome, SkillRequest};
