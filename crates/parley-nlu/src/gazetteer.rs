//! Gazetteer-backed entity model.
//!
//! A gazetteer maps known phrases (places, people, organisations, month
//! names) to labels and canonical values. Matching is accent- and
//! case-insensitive over whole words, longest phrase first. An optional
//! capitalisation heuristic tags unknown capitalised word runs with a lower
//! confidence.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use parley_core::text::CharIndex;
use parley_core::{Entity, EntityLabel, EntitySource, Language};
use regex::Regex;
use serde::Deserialize;

use crate::error::{NluError, Result};
use crate::extractor::EntityModel;
use crate::lexicon::{fold, is_function_word};

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{M}\d]+").expect("Invalid word regex"));

const GAZETTEER_CONFIDENCE: f32 = 0.9;
const HEURISTIC_CONFIDENCE: f32 = 0.45;

/// One phrase entry as written in a gazetteer file.
#[derive(Debug, Clone, Deserialize)]
pub struct GazetteerEntry {
    pub phrase: String,
    pub label: String,
    /// Canonical value; defaults to the phrase itself.
    #[serde(default)]
    pub value: Option<String>,
}

/// On-disk gazetteer format.
#[derive(Debug, Clone, Deserialize)]
pub struct GazetteerFile {
    #[serde(default)]
    pub heuristic: bool,
    #[serde(default)]
    pub entries: Vec<GazetteerEntry>,
}

#[derive(Debug, Clone)]
struct Target {
    label: EntityLabel,
    value: String,
}

/// Phrase-table entity model for a single language.
#[derive(Debug, Clone)]
pub struct GazetteerModel {
    language: Language,
    phrases: HashMap<Vec<String>, Target>,
    longest: usize,
    heuristic: bool,
}

impl GazetteerModel {
    pub fn new(language: Language, heuristic: bool) -> Self {
        Self {
            language,
            phrases: HashMap::new(),
            longest: 0,
            heuristic,
        }
    }

    /// Add or replace a phrase.
    pub fn insert(&mut self, phrase: &str, label: EntityLabel, value: &str) {
        let key: Vec<String> = WORD_RE.find_iter(phrase).map(|m| fold(m.as_str())).collect();
        if key.is_empty() {
            return;
        }
        self.longest = self.longest.max(key.len());
        self.phrases.insert(
            key,
            Target {
                label,
                value: value.to_string(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// The compiled-in gazetteer for `language`.
    pub fn builtin(language: Language) -> Self {
        let mut model = Self::new(language.clone(), true);
        for (phrase, label, value) in COMMON_ENTRIES {
            model.insert(phrase, *label, value);
        }
        let months: &[(&str, &str)] = match language.code() {
            "es" => ES_MONTH_ENTRIES,
            "en" => EN_MONTH_ENTRIES,
            _ => &[],
        };
        for (phrase, value) in months {
            model.insert(phrase, EntityLabel::Date, value);
        }
        model
    }

    /// Load a gazetteer from a TOML file.
    pub fn from_file(language: Language, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: GazetteerFile = toml::from_str(&content).map_err(|e| NluError::ModelLoad {
            id: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut model = Self::new(language, file.heuristic);
        for entry in &file.entries {
            let label: EntityLabel = entry.label.parse().map_err(|e| NluError::ModelLoad {
                id: path.display().to_string(),
                reason: e,
            })?;
            let value = entry.value.as_deref().unwrap_or(&entry.phrase);
            model.insert(&entry.phrase, label, value);
        }
        Ok(model)
    }
}

struct Word {
    folded: String,
    capitalized: bool,
    start_byte: usize,
    end_byte: usize,
}

impl EntityModel for GazetteerModel {
    fn extract(&self, text: &str) -> Vec<Entity> {
        let index = CharIndex::new(text);
        let words: Vec<Word> = WORD_RE
            .find_iter(text)
            .map(|m| Word {
                folded: fold(m.as_str()),
                capitalized: m.as_str().chars().next().is_some_and(char::is_uppercase),
                start_byte: m.start(),
                end_byte: m.end(),
            })
            .collect();

        let make = |from: usize, to: usize, label, value: String, confidence| {
            let (sb, eb) = (words[from].start_byte, words[to - 1].end_byte);
            Entity {
                label,
                value,
                text: text[sb..eb].to_string(),
                start: index.to_char(sb),
                end: index.to_char(eb),
                source: EntitySource::Statistical,
                confidence,
            }
        };

        let mut entities = Vec::new();
        let mut i = 0;
        while i < words.len() {
            let max = self.longest.min(words.len() - i);
            let hit = (1..=max).rev().find_map(|n| {
                let key: Vec<String> = words[i..i + n].iter().map(|w| w.folded.clone()).collect();
                self.phrases.get(&key).map(|t| (n, t))
            });
            if let Some((n, target)) = hit {
                entities.push(make(
                    i,
                    i + n,
                    target.label,
                    target.value.clone(),
                    GAZETTEER_CONFIDENCE,
                ));
                i += n;
                continue;
            }

            // Capitalised run not at the start of the text.
            if self.heuristic && i > 0 && words[i].capitalized {
                let mut j = i;
                while j < words.len()
                    && words[j].capitalized
                    && !is_function_word(&words[j].folded, &self.language)
                {
                    j += 1;
                }
                if j > i {
                    let surface = text[words[i].start_byte..words[j - 1].end_byte].to_string();
                    entities.push(make(i, j, EntityLabel::Misc, surface, HEURISTIC_CONFIDENCE));
                    i = j;
                    continue;
                }
            }
            i += 1;
        }
        entities
    }
}

// =============================================================================
// Built-in entries
// =============================================================================

const COMMON_ENTRIES: &[(&str, EntityLabel, &str)] = &[
    ("Madrid", EntityLabel::Location, "Madrid"),
    ("Barcelona", EntityLabel::Location, "Barcelona"),
    ("Sevilla", EntityLabel::Location, "Sevilla"),
    ("Seville", EntityLabel::Location, "Sevilla"),
    ("Valencia", EntityLabel::Location, "Valencia"),
    ("Bilbao", EntityLabel::Location, "Bilbao"),
    ("Panamá", EntityLabel::Location, "Panamá"),
    ("Ciudad de Panamá", EntityLabel::Location, "Ciudad de Panamá"),
    ("Panama City", EntityLabel::Location, "Ciudad de Panamá"),
    ("México", EntityLabel::Location, "México"),
    ("Ciudad de México", EntityLabel::Location, "Ciudad de México"),
    ("Mexico City", EntityLabel::Location, "Ciudad de México"),
    ("Bogotá", EntityLabel::Location, "Bogotá"),
    ("Buenos Aires", EntityLabel::Location, "Buenos Aires"),
    ("Lima", EntityLabel::Location, "Lima"),
    ("Santiago", EntityLabel::Location, "Santiago"),
    ("Caracas", EntityLabel::Location, "Caracas"),
    ("Quito", EntityLabel::Location, "Quito"),
    ("Londres", EntityLabel::Location, "London"),
    ("London", EntityLabel::Location, "London"),
    ("París", EntityLabel::Location, "Paris"),
    ("Paris", EntityLabel::Location, "Paris"),
    ("Berlín", EntityLabel::Location, "Berlin"),
    ("Berlin", EntityLabel::Location, "Berlin"),
    ("Roma", EntityLabel::Location, "Rome"),
    ("Rome", EntityLabel::Location, "Rome"),
    ("Lisboa", EntityLabel::Location, "Lisbon"),
    ("Lisbon", EntityLabel::Location, "Lisbon"),
    ("Nueva York", EntityLabel::Location, "New York"),
    ("New York", EntityLabel::Location, "New York"),
    ("Tokio", EntityLabel::Location, "Tokyo"),
    ("Tokyo", EntityLabel::Location, "Tokyo"),
    ("España", EntityLabel::Location, "España"),
    ("Spain", EntityLabel::Location, "España"),
    ("Google", EntityLabel::Organization, "Google"),
    ("Microsoft", EntityLabel::Organization, "Microsoft"),
    ("Naciones Unidas", EntityLabel::Organization, "United Nations"),
    ("United Nations", EntityLabel::Organization, "United Nations"),
    ("Cervantes", EntityLabel::Person, "Miguel de Cervantes"),
    ("Miguel de Cervantes", EntityLabel::Person, "Miguel de Cervantes"),
    ("Shakespeare", EntityLabel::Person, "William Shakespeare"),
];

const ES_MONTH_ENTRIES: &[(&str, &str)] = &[
    ("enero", "01"),
    ("febrero", "02"),
    ("marzo", "03"),
    ("abril", "04"),
    ("mayo", "05"),
    ("junio", "06"),
    ("julio", "07"),
    ("agosto", "08"),
    ("septiembre", "09"),
    ("octubre", "10"),
    ("noviembre", "11"),
    ("diciembre", "12"),
];

const EN_MONTH_ENTRIES: &[(&str, &str)] = &[
    ("January", "01"),
    ("February", "02"),
    ("March", "03"),
    ("April", "04"),
    ("June", "06"),
    ("July", "07"),
    ("August", "08"),
    ("September", "09"),
    ("October", "10"),
    ("November", "11"),
    ("December", "12"),
];
