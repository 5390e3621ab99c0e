//! Parley binary - composition root.
//!
//! 1. Parse the CLI and load configuration
//! 2. Install the tracing subscriber
//! 3. Discover skills and build the orchestrator
//! 4. Open the interaction log when storage is enabled
//! 5. Run the requested command

mod cli;

use std::sync::Arc;

use clap::Parser;
use parley_chat::{ChatError, Orchestrator};
use parley_core::{expand_home, InputError, ParleyConfig, SessionId};
use parley_skills::{OfflineForecast, SkillFactory, SkillRegistry};
use parley_storage::{Database, InteractionLog, SqliteInteractionLog};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use cli::{CliArgs, Command};

const EXIT_WORDS: &[&str] = &["exit", "quit", "salir", "adiós", "adios"];

/// Open the interaction log, or run without one if that fails.
fn open_log(config: &ParleyConfig) -> Option<Arc<SqliteInteractionLog>> {
    if !config.storage.enabled {
        tracing::info!("Interaction log disabled in config");
        return None;
    }
    let db_path = expand_home(&config.general.data_dir).join(&config.storage.db_file);
    match Database::new(&db_path) {
        Ok(db) => Some(Arc::new(SqliteInteractionLog::new(Arc::new(db)))),
        Err(e) => {
            tracing::warn!(path = %db_path.display(), error = %e, "Interaction log unavailable");
            None
        }
    }
}

async fn chat_loop(
    orchestrator: &Orchestrator,
    session: &SessionId,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    tracing::info!(session = %session, "Chat session started");
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if EXIT_WORDS.contains(&line.to_lowercase().as_str()) {
            break;
        }

        match orchestrator.handle(session, line).await {
            Ok(turn) => {
                stdout.write_all(turn.response_text.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
            Err(ChatError::Input(InputError::Empty)) => continue,
            Err(e) => {
                stdout.write_all(format!("({})\n", e).as_bytes()).await?;
            }
        }
    }
    Ok(())
}

fn print_skills(registry: &SkillRegistry) {
    for skill in registry.skills() {
        let descriptor = skill.descriptor();
        let intents: Vec<&str> = descriptor.intents.iter().map(|i| i.name.as_str()).collect();
        println!("{:<12} {:<40} [{}]", descriptor.name, descriptor.description, intents.join(", "));
    }
}

async fn print_history(
    log: Option<&SqliteInteractionLog>,
    session: Option<SessionId>,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(log) = log else {
        println!("The interaction log is disabled.");
        return Ok(());
    };
    match session {
        Some(session) => {
            let mut turns = log.recent(&session, limit).await?;
            turns.reverse();
            for turn in turns {
                println!(
                    "{} [{} {} {:.2}] {}\n    -> {} ({})",
                    turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    turn.language,
                    turn.intent,
                    turn.intent_confidence,
                    turn.utterance,
                    turn.response,
                    turn.skill.as_deref().unwrap_or("fallback"),
                );
            }
        }
        None => {
            for count in log.skill_counts().await? {
                println!("{:<12} {}", count.skill, count.turns);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = ParleyConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let factory = SkillFactory::new(Arc::new(OfflineForecast));
    let registry = Arc::new(SkillRegistry::from_config(&config.skills, &factory)?);
    let log = open_log(&config);

    let command = args.command();
    match command {
        Command::Skills => {
            print_skills(&registry);
            return Ok(());
        }
        Command::History { limit } => {
            return print_history(log.as_deref(), args.explicit_session(), limit).await;
        }
        Command::Chat | Command::Ask { .. } => {}
    }

    let mut orchestrator =
        Orchestrator::from_config(&config, registry)?.with_utc_offset(factory.offset());
    if let Some(log) = &log {
        orchestrator = orchestrator.with_interaction_log(log.clone() as Arc<dyn InteractionLog>);
    }
    let session = args.resolve_session();

    match command {
        Command::Ask { text, json } => {
            let turn = orchestrator.handle(&session, &text.join(" ")).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&turn)?);
            } else {
                println!("{}", turn.response_text);
            }
        }
        _ => chat_loop(&orchestrator, &session).await?,
    }

    Ok(())
}
