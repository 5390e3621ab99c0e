use async_trait::async_trait;
use parley_nlu::IntentLabel;

use super::locale::pick;
use crate::error::SkillError;
use crate::skill::{Skill, SkillDescriptor, SkillOutcome, SkillRequest};

pub const INTENT: &str = "help";

pub fn descriptor() -> SkillDescriptor {
    SkillDescriptor::new("help")
        .description("Explains what the assistant can do")
        .intent(
            IntentLabel::new(INTENT)
                .keyword("es", "ayuda")
                .keyword("es", "ayúdame")
                .keyword("en", "help")
                .example("es", "qué puedes hacer")
                .example("es", "necesito ayuda")
                .example("en", "what can you do")
                .example("en", "i need help"),
        )
}

pub struct HelpSkill {
    descriptor: SkillDescriptor,
    /// Also answer turns nobody classified.
    handle_unknown: bool,
}

impl HelpSkill {
    pub fn new(descriptor: SkillDescriptor, handle_unknown: bool) -> Self {
        Self {
            descriptor,
            handle_unknown,
        }
    }
}

#[async_trait]
impl Skill for HelpSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, request: &SkillRequest) -> Result<bool, SkillError> {
        Ok(self.descriptor.declares(&request.intent.label)
            || (self.handle_unknown && request.intent.is_unknown()))
    }

    async fn handle(&self, request: &SkillRequest) -> Result<SkillOutcome, SkillError> {
        let text = pick(
            &request.language,
            "Puedo decirte la hora, la fecha o el clima de una ciudad, y guardar recordatorios. Di \"olvida todo\" para empezar de nuevo.",
            "I can tell you the time, the date or the weather in a city, and keep reminders. Say \"start over\" to reset.",
        );
        Ok(SkillOutcome::reply(text))
    }
}
