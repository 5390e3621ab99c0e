use async_trait::async_trait;
use parley_dialog::ContextDelta;
use parley_nlu::IntentLabel;

use super::locale::pick;
use crate::error::SkillError;
use crate::skill::{Skill, SkillDescriptor, SkillOutcome, SkillRequest};

pub const INTENT: &str = "reset_context";

pub fn descriptor() -> SkillDescriptor {
    SkillDescriptor::new("reset")
        .description("Forgets the conversation so far")
        .intent(
            IntentLabel::new(INTENT)
                .keyword("es", "olvida")
                .keyword("es", "reinicia")
                .keyword("es", "cancela")
                .keyword("en", "forget")
                .keyword("en", "reset")
                .keyword("en", "cancel")
                .example("es", "olvida todo")
                .example("es", "empecemos de nuevo")
                .example("en", "forget everything")
                .example("en", "start over"),
        )
}

/// Drops every slot, extra entry and remembered intent for the session.
pub struct ResetSkill {
    descriptor: SkillDescriptor,
}

impl ResetSkill {
    pub fn new(descriptor: SkillDescriptor) -> Self {
        Self { descriptor }
    }
}

#[async_trait]
impl Skill for ResetSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, request: &SkillRequest) -> Result<bool, SkillError> {
        Ok(self.descriptor.declares(&request.intent.label))
    }

    async fn handle(&self, request: &SkillRequest) -> Result<SkillOutcome, SkillError> {
        let text = pick(
            &request.language,
            "De acuerdo, empecemos de nuevo.",
            "Okay, let's start over.",
        );
        Ok(SkillOutcome::new(text, ContextDelta::reset()))
    }
}
