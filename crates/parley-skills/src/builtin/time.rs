//! Current time of day.

use async_trait::async_trait;
use chrono::{FixedOffset, Timelike};
use parley_nlu::IntentLabel;

use crate::error::SkillError;
use crate::skill::{Skill, SkillDescriptor, SkillOutcome, SkillRequest};

pub const INTENT: &str = "get_time";

pub fn descriptor() -> SkillDescriptor {
    SkillDescriptor::new("time")
        .description("Tells the current time")
        .intent(
            IntentLabel::new(INTENT)
                .keyword("es", "hora")
                .keyword("en", "time")
                .example("es", "qué hora es")
                .example("es", "dime la hora")
                .example("en", "what time is it")
                .example("en", "tell me the time"),
        )
}

pub struct TimeSkill {
    descriptor: SkillDescriptor,
    offset: FixedOffset,
}

impl TimeSkill {
    pub fn new(descriptor: SkillDescriptor, offset: FixedOffset) -> Self {
        Self { descriptor, offset }
    }
}

#[async_trait]
impl Skill for TimeSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, request: &SkillRequest) -> Result<bool, SkillError> {
        Ok(self.descriptor.declares(&request.intent.label))
    }

    async fn handle(&self, request: &SkillRequest) -> Result<SkillOutcome, SkillError> {
        let local = request.received_at.with_timezone(&self.offset);
        let (hour, minute) = (local.hour(), local.minute());
        let response = if request.language.code() == "es" {
            let lead = if hour == 1 || hour == 13 { "Es la" } else { "Son las" };
            format!("{} {}:{:02}.", lead, hour, minute)
        } else {
            format!("The current time is {:02}:{:02}.", hour, minute)
        };
        Ok(SkillOutcome::reply(response))
    }
}
