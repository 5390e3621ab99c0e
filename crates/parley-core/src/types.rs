use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParleyError;

// =============================================================================
// Language
// =============================================================================

/// A lowercase ISO 639-1 language code such as `es` or `en`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    /// Parse and normalize a language code.
    ///
    /// Accepts two or three ASCII letters in any case.
    pub fn new(code: &str) -> Result<Self, ParleyError> {
        let code = code.trim();
        let valid = (2..=3).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphabetic());
        if !valid {
            return Err(ParleyError::InvalidLanguage(code.to_string()));
        }
        Ok(Self(code.to_ascii_lowercase()))
    }

    pub fn es() -> Self {
        Self("es".to_string())
    }

    pub fn en() -> Self {
        Self("en".to_string())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Language {
    type Err = ParleyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::new(s)
    }
}

impl TryFrom<String> for Language {
    type Error = ParleyError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Language::new(&value)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.0
    }
}

// =============================================================================
// Session
// =============================================================================

/// Opaque identifier of one conversational thread.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random session id.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// =============================================================================
// Utterance
// =============================================================================

/// One user utterance after language resolution. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    text: String,
    language: Language,
    received_at: DateTime<Utc>,
}

impl Utterance {
    pub fn new(text: impl Into<String>, language: Language, received_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            language,
            received_at,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

// =============================================================================
// Entities
// =============================================================================

/// Entity categories produced by the extractors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityLabel {
    Date,
    Time,
    Location,
    Person,
    Organization,
    Quantity,
    Misc,
}

/// Coarse grouping of entity labels used by the merge policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityFamily {
    /// Dates and times: structured values where rules are authoritative.
    Temporal,
    /// Open-class names (places, people, organisations).
    Named,
    Numeric,
    Other,
}

impl EntityLabel {
    pub fn family(&self) -> EntityFamily {
        match self {
            EntityLabel::Date | EntityLabel::Time => EntityFamily::Temporal,
            EntityLabel::Location | EntityLabel::Person | EntityLabel::Organization => {
                EntityFamily::Named
            }
            EntityLabel::Quantity => EntityFamily::Numeric,
            EntityLabel::Misc => EntityFamily::Other,
        }
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityLabel::Date => write!(f, "DATE"),
            EntityLabel::Time => write!(f, "TIME"),
            EntityLabel::Location => write!(f, "LOCATION"),
            EntityLabel::Person => write!(f, "PERSON"),
            EntityLabel::Organization => write!(f, "ORGANIZATION"),
            EntityLabel::Quantity => write!(f, "QUANTITY"),
            EntityLabel::Misc => write!(f, "MISC"),
        }
    }
}

impl FromStr for EntityLabel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DATE" => Ok(EntityLabel::Date),
            "TIME" => Ok(EntityLabel::Time),
            "LOCATION" | "LOC" | "GPE" => Ok(EntityLabel::Location),
            "PERSON" | "PER" => Ok(EntityLabel::Person),
            "ORGANIZATION" | "ORG" => Ok(EntityLabel::Organization),
            "QUANTITY" => Ok(EntityLabel::Quantity),
            "MISC" => Ok(EntityLabel::Misc),
            _ => Err(format!("Unknown entity label: {}", s)),
        }
    }
}

/// Which extractor produced an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySource {
    Rule,
    Statistical,
}

impl fmt::Display for EntitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntitySource::Rule => write!(f, "rule"),
            EntitySource::Statistical => write!(f, "statistical"),
        }
    }
}

/// A typed, located span of the utterance.
///
/// `start` and `end` are character offsets, end exclusive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub label: EntityLabel,
    /// Normalized value (ISO date, `HH:MM`, title-cased place, ...).
    pub value: String,
    /// Surface text of the span as it appears in the utterance.
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub source: EntitySource,
    pub confidence: f32,
}

impl Entity {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two half-open spans share at least one character.
    pub fn overlaps(&self, other: &Entity) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether the span is non-empty and inside an utterance of `char_len` chars.
    pub fn is_within(&self, char_len: usize) -> bool {
        self.start < self.end && self.end <= char_len
    }
}

// =============================================================================
// Intents
// =============================================================================

/// Label emitted when no candidate clears the confidence threshold.
pub const UNKNOWN_INTENT: &str = "unknown";

/// One candidate label with its score from a single classification call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    pub score: f32,
}

/// Outcome of intent classification.
///
/// Confidences are only comparable within one classification call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub label: String,
    pub confidence: f32,
    /// Every scored candidate, best first.
    pub alternates: Vec<ScoredLabel>,
}

impl IntentResult {
    /// The sentinel result, keeping whatever scores were produced.
    pub fn unknown(confidence: f32, alternates: Vec<ScoredLabel>) -> Self {
        Self {
            label: UNKNOWN_INTENT.to_string(),
            confidence,
            alternates,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.label == UNKNOWN_INTENT
    }

    /// Score of `label` in this call, if it was a candidate.
    pub fn score_of(&self, label: &str) -> Option<f32> {
        self.alternates
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.score)
    }
}
