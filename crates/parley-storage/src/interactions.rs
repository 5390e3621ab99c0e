//! Per-turn interaction log.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::{Entity, ParleyError, SessionId};
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::db::Database;

/// One conversational turn as it was processed.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRecord {
    pub id: Uuid,
    pub session_id: SessionId,
    pub utterance: String,
    pub language: String,
    pub intent: String,
    pub intent_confidence: f32,
    pub entities: Vec<Entity>,
    /// Skill that handled the turn; `None` when the fallback answered.
    pub skill: Option<String>,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

/// How many turns one skill has handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillCount {
    pub skill: String,
    pub turns: u64,
}

/// Sink for turn records.
#[async_trait]
pub trait InteractionLog: Send + Sync {
    async fn record(&self, record: InteractionRecord) -> Result<(), ParleyError>;

    /// Most recent turns of a session, newest first.
    async fn recent(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, ParleyError>;

    /// Handled-turn counts per skill, busiest first.
    async fn skill_counts(&self) -> Result<Vec<SkillCount>, ParleyError>;
}

/// [`InteractionLog`] backed by the SQLite database. Queries run on the
/// blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteInteractionLog {
    db: Arc<Database>,
}

impl SqliteInteractionLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn insert(db: &Database, record: &InteractionRecord) -> Result<(), ParleyError> {
        let entities = serde_json::to_string(&record.entities)
            .map_err(|e| ParleyError::Serialization(e.to_string()))?;
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO interactions
                    (id, session_id, timestamp, utterance, language, intent,
                     intent_confidence, entities, skill, response)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id.to_string(),
                    record.session_id.as_str(),
                    record.timestamp.timestamp_millis(),
                    record.utterance,
                    record.language,
                    record.intent,
                    f64::from(record.intent_confidence),
                    entities,
                    record.skill,
                    record.response,
                ],
            )
            .map_err(|e| ParleyError::Storage(format!("Insert interaction: {}", e)))?;
            Ok(())
        })
    }

    fn select_recent(
        db: &Database,
        session: &SessionId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, ParleyError> {
        db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, session_id, timestamp, utterance, language, intent,
                            intent_confidence, entities, skill, response
                     FROM interactions
                     WHERE session_id = ?1
                     ORDER BY timestamp DESC, rowid DESC
                     LIMIT ?2",
                )
                .map_err(|e| ParleyError::Storage(format!("Recent query prepare: {}", e)))?;

            let rows = stmt
                .query_map(params![session.as_str(), limit as i64], |row| {
                    Ok(map_record(row))
                })
                .map_err(|e| ParleyError::Storage(format!("Recent query: {}", e)))?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row.map_err(|e| ParleyError::Storage(e.to_string()))??);
            }
            Ok(results)
        })
    }

    fn select_skill_counts(db: &Database) -> Result<Vec<SkillCount>, ParleyError> {
        db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT skill, COUNT(*) AS turns
                     FROM interactions
                     WHERE skill IS NOT NULL
                     GROUP BY skill
                     ORDER BY turns DESC, skill ASC",
                )
                .map_err(|e| ParleyError::Storage(format!("Skill count prepare: {}", e)))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(SkillCount {
                        skill: row.get(0)?,
                        turns: row.get::<_, i64>(1)? as u64,
                    })
                })
                .map_err(|e| ParleyError::Storage(format!("Skill count query: {}", e)))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| ParleyError::Storage(e.to_string()))
        })
    }
}

fn map_record(row: &Row<'_>) -> Result<InteractionRecord, ParleyError> {
    let get_err = |e: rusqlite::Error| ParleyError::Storage(e.to_string());

    let id: String = row.get(0).map_err(get_err)?;
    let session: String = row.get(1).map_err(get_err)?;
    let millis: i64 = row.get(2).map_err(get_err)?;
    let confidence: f64 = row.get(6).map_err(get_err)?;
    let entities: String = row.get(7).map_err(get_err)?;

    Ok(InteractionRecord {
        id: Uuid::parse_str(&id).map_err(|e| ParleyError::Storage(e.to_string()))?,
        session_id: SessionId::new(session),
        utterance: row.get(3).map_err(get_err)?,
        language: row.get(4).map_err(get_err)?,
        intent: row.get(5).map_err(get_err)?,
        intent_confidence: confidence as f32,
        entities: serde_json::from_str(&entities)
            .map_err(|e| ParleyError::Serialization(e.to_string()))?,
        skill: row.get(8).map_err(get_err)?,
        response: row.get(9).map_err(get_err)?,
        timestamp: DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| ParleyError::Storage(format!("Bad timestamp {}", millis)))?,
    })
}

fn join_error(e: tokio::task::JoinError) -> ParleyError {
    ParleyError::Storage(format!("Storage task failed: {}", e))
}

#[async_trait]
impl InteractionLog for SqliteInteractionLog {
    async fn record(&self, record: InteractionRecord) -> Result<(), ParleyError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || Self::insert(&db, &record))
            .await
            .map_err(join_error)?
    }

    async fn recent(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, ParleyError> {
        let db = self.db.clone();
        let session = session.clone();
        tokio::task::spawn_blocking(move || Self::select_recent(&db, &session, limit))
            .await
            .map_err(join_error)?
    }

    async fn skill_counts(&self) -> Result<Vec<SkillCount>, ParleyError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || Self::select_skill_counts(&db))
            .await
            .map_err(join_error)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use parley_core::{EntityLabel, EntitySource};

    fn record(session: &str, skill: Option<&str>, offset_secs: i64) -> InteractionRecord {
        InteractionRecord {
            id: Uuid::new_v4(),
            session_id: SessionId::new(session),
            utterance: "qué tiempo hace en Madrid".to_string(),
            language: "es".to_string(),
            intent: "get_weather".to_string(),
            intent_confidence: 0.8,
            entities: vec![Entity {
                label: EntityLabel::Location,
                value: "Madrid".to_string(),
                text: "Madrid".to_string(),
                start: 19,
                end: 25,
                source: EntitySource::Rule,
                confidence: 1.0,
            }],
            skill: skill.map(str::to_string),
            response: "ok".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap()
                + Duration::seconds(offset_secs),
        }
    }

    fn log() -> SqliteInteractionLog {
        SqliteInteractionLog::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let log = log();
        let original = record("s1", Some("weather"), 0);
        log.record(original.clone()).await.unwrap();

        let recent = log.recent(&SessionId::new("s1"), 10).await.unwrap();
        assert_eq!(recent, vec![original]);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_per_session() {
        let log = log();
        for i in 0..5 {
            log.record(record("s1", Some("weather"), i)).await.unwrap();
        }
        log.record(record("s2", None, 10)).await.unwrap();

        let recent = log.recent(&SessionId::new("s1"), 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
        assert!(recent.iter().all(|r| r.session_id.as_str() == "s1"));
    }

    #[tokio::test]
    async fn test_skill_counts() {
        let log = log();
        log.record(record("s1", Some("weather"), 0)).await.unwrap();
        log.record(record("s1", Some("weather"), 1)).await.unwrap();
        log.record(record("s1", Some("time"), 2)).await.unwrap();
        log.record(record("s1", None, 3)).await.unwrap();

        let counts = log.skill_counts().await.unwrap();
        assert_eq!(
            counts,
            vec![
                SkillCount {
                    skill: "weather".to_string(),
                    turns: 2
                },
                SkillCount {
                    skill: "time".to_string(),
                    turns: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_file_backed_log_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parley.db");
        {
            let log = SqliteInteractionLog::new(Arc::new(Database::new(&path).unwrap()));
            log.record(record("s1", Some("time"), 0)).await.unwrap();
        }
        let log = SqliteInteractionLog::new(Arc::new(Database::new(&path).unwrap()));
        assert_eq!(log.recent(&SessionId::new("s1"), 5).await.unwrap().len(), 1);
    }
}
