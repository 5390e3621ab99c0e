//! Shared building blocks for the Parley assistant pipeline.
//!
//! Holds configuration, the top-level error type, and the value types that
//! flow between the NLU, dialog, skill, and chat crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{expand_home, ParleyConfig};
pub use error::{InputError, ParleyError, Result};
pub use types::*;
