//! CLI argument definitions for the Parley binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parley_core::SessionId;

/// Parley: a multilingual assistant that routes what you say to skills.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for the interaction log.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Session id; a random one is used when omitted.
    #[arg(short = 's', long = "session", global = true)]
    pub session: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive conversation on stdin (the default).
    Chat,
    /// Run a single turn and print the response.
    Ask {
        /// The utterance.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        /// Print the full turn as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List registered skills and the intents they declare.
    Skills,
    /// Show logged turns for --session, or per-skill counts without one.
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

impl CliArgs {
    /// Priority: --config flag > PARLEY_CONFIG env var > ~/.parley/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PARLEY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }

    /// The session given on the command line, if any.
    pub fn explicit_session(&self) -> Option<SessionId> {
        self.session
            .as_deref()
            .map(SessionId::new)
            .filter(|s| !s.is_empty())
    }

    pub fn resolve_session(&self) -> SessionId {
        self.explicit_session().unwrap_or_else(SessionId::random)
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }
}

fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    PathBuf::from("config.toml")
}
