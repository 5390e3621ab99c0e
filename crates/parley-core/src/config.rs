use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ParleyError, Result};
use crate::types::Language;

/// Top-level configuration for Parley.
///
/// Loaded from `~/.parley/config.toml` by default. Every section falls back
/// to its defaults when missing, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub language: LanguageConfig,
    #[serde(default)]
    pub nlu: NluConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub skills: SkillsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl ParleyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ParleyConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or is invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check value ranges and cross-section consistency.
    pub fn validate(&self) -> Result<()> {
        check_unit("language.confidence_floor", self.language.confidence_floor)?;
        check_unit("nlu.intent_threshold", self.nlu.intent_threshold)?;
        check_unit("nlu.entity_confidence_floor", self.nlu.entity_confidence_floor)?;

        let supported = self.language.supported_languages()?;
        if supported.is_empty() {
            return Err(ParleyError::Config(
                "language.supported must list at least one language".to_string(),
            ));
        }
        let default = self.language.default_language()?;
        if !supported.contains(&default) {
            return Err(ParleyError::Config(format!(
                "language.default {:?} is not in language.supported",
                default.code()
            )));
        }
        for lang in self.nlu.models.keys() {
            Language::new(lang)?;
        }

        if self.context.idle_expiry_secs == 0 {
            return Err(ParleyError::Config(
                "context.idle_expiry_secs must be greater than zero".to_string(),
            ));
        }
        if self.orchestrator.max_utterance_chars == 0 {
            return Err(ParleyError::Config(
                "orchestrator.max_utterance_chars must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ParleyError::Config(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

/// Expand a leading `~/` using `HOME` (or `USERPROFILE` on Windows).
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the interaction database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.parley/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Language detection and resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Languages the detector may return.
    pub supported: Vec<String>,
    /// Used when detection is unsure and the session has no previous turn.
    pub default: String,
    /// Detections below this confidence are resolved from context.
    pub confidence_floor: f32,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            supported: vec!["es".to_string(), "en".to_string()],
            default: "es".to_string(),
            confidence_floor: 0.6,
        }
    }
}

impl LanguageConfig {
    pub fn supported_languages(&self) -> Result<Vec<Language>> {
        self.supported.iter().map(|code| Language::new(code)).collect()
    }

    pub fn default_language(&self) -> Result<Language> {
        Language::new(&self.default)
    }
}

/// Classifier and extractor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NluConfig {
    /// Intents scoring below this become `unknown`.
    pub intent_threshold: f32,
    /// Statistical entities below this are dropped before merging.
    pub entity_confidence_floor: f32,
    /// Per-language model identifiers, keyed by language code.
    pub models: BTreeMap<String, ModelConfig>,
}

impl Default for NluConfig {
    fn default() -> Self {
        let mut models = BTreeMap::new();
        for lang in ["es", "en"] {
            models.insert(
                lang.to_string(),
                ModelConfig {
                    entity_model: Some(format!("builtin:{}", lang)),
                    intent_model: Some(format!("builtin:{}", lang)),
                },
            );
        }
        Self {
            intent_threshold: 0.35,
            entity_confidence_floor: 0.5,
            models,
        }
    }
}

impl NluConfig {
    pub fn entity_model(&self, lang: &Language) -> Option<&str> {
        self.models
            .get(lang.code())
            .and_then(|m| m.entity_model.as_deref())
    }

    pub fn intent_model(&self, lang: &Language) -> Option<&str> {
        self.models
            .get(lang.code())
            .and_then(|m| m.intent_model.as_deref())
    }
}

/// Model identifiers for one language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// `builtin:<lang>` or `file:<path>`.
    pub entity_model: Option<String>,
    /// `builtin:<lang>`; `None` disables classification for the language.
    pub intent_model: Option<String>,
}

/// Conversation context settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Sessions idle longer than this start over as NEW.
    pub idle_expiry_secs: u64,
    pub max_pending_slots: usize,
    pub max_extra_entries: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            idle_expiry_secs: 300,
            max_pending_slots: 16,
            max_extra_entries: 64,
        }
    }
}

/// Skill discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    /// Directory scanned for `<name>/skill.toml` manifests.
    pub dir: String,
    /// Register the compiled-in skill set when the directory yields nothing.
    pub builtin_defaults: bool,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            dir: "~/.parley/skills".to_string(),
            builtin_defaults: true,
        }
    }
}

/// Interaction log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub enabled: bool,
    /// Database file name, relative to `general.data_dir`.
    pub db_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_file: "parley.db".to_string(),
        }
    }
}

/// Per-turn pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound on one turn, in milliseconds.
    pub turn_timeout_ms: u64,
    pub max_utterance_chars: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            turn_timeout_ms: 5_000,
            max_utterance_chars: 500,
        }
    }
}
