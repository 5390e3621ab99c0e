//! Database schema migrations.

use parley_core::ParleyError;
use rusqlite::Connection;
use tracing::info;

/// Run all pending migrations. Idempotent.
pub fn run_migrations(conn: &Connection) -> Result<(), ParleyError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ParleyError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ParleyError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: interactions");
    }

    Ok(())
}

/// Version 1: the per-turn interaction log.
fn apply_v1(conn: &Connection) -> Result<(), ParleyError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS interactions (
            id                  TEXT PRIMARY KEY NOT NULL,
            session_id          TEXT NOT NULL,
            timestamp           INTEGER NOT NULL,
            utterance           TEXT NOT NULL,
            language            TEXT NOT NULL,
            intent              TEXT NOT NULL,
            intent_confidence   REAL NOT NULL DEFAULT 0.0,
            entities            TEXT NOT NULL DEFAULT '[]',
            skill               TEXT,
            response            TEXT NOT NULL DEFAULT '',
            created_at          INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_interactions_session
            ON interactions (session_id, timestamp DESC);

        CREATE INDEX IF NOT EXISTS idx_interactions_skill
            ON interactions (skill)
            WHERE skill IS NOT NULL;

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'interactions');
        ",
    )
    .map_err(|e| ParleyError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
