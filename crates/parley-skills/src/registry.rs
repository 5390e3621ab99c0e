//! Ordered collection of skills.

use std::path::Path;
use std::sync::Arc;

use parley_core::config::{expand_home, SkillsConfig};
use parley_nlu::LabelSet;
use tracing::{debug, info, warn};

use crate::builtin::SkillFactory;
use crate::error::SkillError;
use crate::manifest::SkillManifest;
use crate::skill::Skill;

const MANIFEST_FILE: &str = "skill.toml";

/// Skills in registration order.
///
/// Registration order is the dispatch tie-break: when several skills accept
/// a turn, the one registered first handles it. Directory-loaded skills are
/// registered in lexicographic order of their directory names.
#[derive(Default)]
pub struct SkillRegistry {
    skills: Vec<Arc<dyn Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skills from `config.dir`, or the built-in set when the directory
    /// yields none and `builtin_defaults` is on.
    pub fn from_config(config: &SkillsConfig, factory: &SkillFactory) -> Result<Self, SkillError> {
        let mut registry = Self::new();
        let dir = expand_home(&config.dir);
        let loaded = registry.load_dir(&dir, factory)?;
        if loaded == 0 && config.builtin_defaults {
            for skill in factory.builtin_set()? {
                registry.register(skill)?;
            }
            debug!(count = registry.len(), "Registered built-in skills");
        }
        info!(skills = ?registry.names(), "Skill registry ready");
        Ok(registry)
    }

    pub fn register(&mut self, skill: Arc<dyn Skill>) -> Result<(), SkillError> {
        if self.skills.iter().any(|s| s.name() == skill.name()) {
            return Err(SkillError::DuplicateName(skill.name().to_string()));
        }
        self.skills.push(skill);
        Ok(())
    }

    /// Register every `<dir>/<name>/skill.toml`. A missing directory loads
    /// nothing; bad manifests are logged and skipped. Returns how many
    /// skills were registered.
    pub fn load_dir(&mut self, dir: &Path, factory: &SkillFactory) -> Result<usize, SkillError> {
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "Skill directory not found");
            return Ok(0);
        }

        let mut manifests: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path().join(MANIFEST_FILE))
            .filter(|path| path.is_file())
            .collect();
        manifests.sort();

        let mut loaded = 0;
        for path in manifests {
            let manifest = match SkillManifest::load(&path) {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), err = %e, "bad skill manifest");
                    continue;
                }
            };
            if !manifest.enabled {
                debug!(skill = %manifest.name, "Skill disabled");
                continue;
            }
            let registered = factory
                .create(&manifest)
                .and_then(|skill| self.register(skill));
            match registered {
                Ok(()) => loaded += 1,
                Err(e) => warn!(path = %path.display(), err = %e, "Skipping skill"),
            }
        }
        Ok(loaded)
    }

    pub fn skills(&self) -> &[Arc<dyn Skill>] {
        &self.skills
    }

    pub fn names(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.name()).collect()
    }

    /// Every intent any registered skill declares.
    pub fn label_set(&self) -> LabelSet {
        LabelSet::new(
            self.skills
                .iter()
                .flat_map(|s| s.descriptor().intents.iter().cloned()),
        )
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
