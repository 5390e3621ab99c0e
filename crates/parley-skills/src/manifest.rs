//! `skill.toml` manifests.

use std::collections::BTreeMap;
use std::path::Path;

use parley_nlu::IntentLabel;
use serde::{Deserialize, Serialize};

use crate::error::SkillError;

/// Manifest describing a skill, read from `skill.toml` in the skill directory.
///
/// ```toml
/// name = "greetings"
/// kind = "reply"
///
/// [[intents]]
/// name = "greet"
/// keywords = { es = ["hola"], en = ["hello"] }
///
/// [responses]
/// es = "¡Hola!"
/// en = "Hello!"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillManifest {
    pub name: String,
    /// `weather`, `time`, `date`, `reminder`, `reset`, `help` or `reply`.
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Extra intents; added to a built-in kind's own declarations.
    #[serde(default)]
    pub intents: Vec<IntentLabel>,
    /// Per-language response templates for the `reply` kind.
    #[serde(default)]
    pub responses: BTreeMap<String, String>,
    /// Kind-specific settings.
    #[serde(default)]
    pub options: toml::Table,
}

fn default_true() -> bool {
    true
}

impl SkillManifest {
    /// A manifest for a built-in kind with no overrides.
    pub fn builtin(kind: &str) -> Self {
        Self {
            name: kind.to_string(),
            kind: kind.to_string(),
            description: String::new(),
            enabled: true,
            intents: Vec::new(),
            responses: BTreeMap::new(),
            options: toml::Table::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, SkillError> {
        let content = std::fs::read_to_string(path)?;
        let manifest: SkillManifest =
            toml::from_str(&content).map_err(|e| SkillError::Manifest {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        if manifest.name.trim().is_empty() {
            return Err(SkillError::Manifest {
                path: path.display().to_string(),
                reason: "empty skill name".to_string(),
            });
        }
        Ok(manifest)
    }

    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(toml::Value::as_bool)
    }
}
