//! Parley storage: a WAL-mode SQLite database holding the interaction log.
//!
//! One row is written per conversational turn. The pipeline treats the log
//! as optional; nothing upstream fails when it is absent or erroring.

pub mod db;
pub mod interactions;
pub mod migrations;

pub use db::Database;
pub use interactions::{InteractionLog, InteractionRecord, SkillCount, SqliteInteractionLog};
