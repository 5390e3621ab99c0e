use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::{Entity, EntityLabel, IntentResult, Language};
use parley_dialog::{ContextDelta, ConversationContext};
use parley_nlu::IntentLabel;

use crate::error::SkillError;

/// Static description of a skill: its name and the intents it declares.
///
/// Declared intents feed the classifier's label set; nothing else does.
#[derive(Debug, Clone, Default)]
pub struct SkillDescriptor {
    pub name: String,
    pub description: String,
    pub intents: Vec<IntentLabel>,
    /// Free-form capability tags, e.g. `entity:LOCATION`.
    pub capabilities: Vec<String>,
}

impl SkillDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn intent(mut self, label: IntentLabel) -> Self {
        self.intents.push(label);
        self
    }

    pub fn capability(mut self, tag: impl Into<String>) -> Self {
        self.capabilities.push(tag.into());
        self
    }

    /// Whether `label` is one of this skill's declared intents.
    pub fn declares(&self, label: &str) -> bool {
        self.intents.iter().any(|i| i.name == label)
    }
}

/// Everything a skill sees about the current turn. Owned, so it can cross
/// task boundaries.
#[derive(Debug, Clone)]
pub struct SkillRequest {
    pub text: String,
    pub language: Language,
    /// Merged, span-disjoint entities ordered by start offset.
    pub entities: Vec<Entity>,
    pub intent: IntentResult,
    /// Snapshot taken before dispatch; changes go through the outcome delta.
    pub context: ConversationContext,
    pub received_at: DateTime<Utc>,
}

impl SkillRequest {
    pub fn first_entity(&self, label: EntityLabel) -> Option<&Entity> {
        self.entities.iter().find(|e| e.label == label)
    }

    pub fn entities_of(&self, label: EntityLabel) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.label == label)
    }

    pub fn intent_is(&self, label: &str) -> bool {
        self.intent.label == label
    }
}

/// Result of a successful `handle` call.
#[derive(Debug, Clone, Default)]
pub struct SkillOutcome {
    pub response: String,
    pub delta: ContextDelta,
}

impl SkillOutcome {
    pub fn new(response: impl Into<String>, delta: ContextDelta) -> Self {
        Self {
            response: response.into(),
            delta,
        }
    }

    /// A response that leaves the context untouched.
    pub fn reply(response: impl Into<String>) -> Self {
        Self::new(response, ContextDelta::new())
    }
}

/// A pluggable action handler.
///
/// `can_handle` must be side-effect free and fast; `handle` may be slow and
/// may fail. Either failing, or panicking, only means the skill did not
/// handle this turn.
#[async_trait]
pub trait Skill: Send + Sync {
    fn descriptor(&self) -> &SkillDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    fn can_handle(&self, request: &SkillRequest) -> Result<bool, SkillError>;

    async fn handle(&self, request: &SkillRequest) -> Result<SkillOutcome, SkillError>;
}
