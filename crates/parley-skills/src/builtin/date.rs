//! Today's date, or the weekday of a mentioned date.

use async_trait::async_trait;
use chrono::{Datelike, FixedOffset, NaiveDate};
use parley_core::EntityLabel;
use parley_nlu::IntentLabel;

use super::locale::{long_date, weekday_name};
use crate::error::SkillError;
use crate::skill::{Skill, SkillDescriptor, SkillOutcome, SkillRequest};

pub const INTENT: &str = "get_date";

pub fn descriptor() -> SkillDescriptor {
    SkillDescriptor::new("date")
        .description("Tells today's date")
        .capability("entity:DATE")
        .intent(
            IntentLabel::new(INTENT)
                .keyword("es", "fecha")
                .keyword("es", "día")
                .keyword("en", "date")
                .keyword("en", "day")
                .example("es", "qué día es hoy")
                .example("es", "qué fecha es")
                .example("en", "what's the date today")
                .example("en", "what day is it"),
        )
}

pub struct DateSkill {
    descriptor: SkillDescriptor,
    offset: FixedOffset,
}

impl DateSkill {
    pub fn new(descriptor: SkillDescriptor, offset: FixedOffset) -> Self {
        Self { descriptor, offset }
    }
}

#[async_trait]
impl Skill for DateSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, request: &SkillRequest) -> Result<bool, SkillError> {
        Ok(self.descriptor.declares(&request.intent.label))
    }

    async fn handle(&self, request: &SkillRequest) -> Result<SkillOutcome, SkillError> {
        let lang = &request.language;
        let today = request.received_at.with_timezone(&self.offset).date_naive();
        let mentioned = request
            .first_entity(EntityLabel::Date)
            .and_then(|e| NaiveDate::parse_from_str(&e.value, "%Y-%m-%d").ok())
            .filter(|d| *d != today);

        let response = match (mentioned, lang.code()) {
            (Some(date), "es") => format!(
                "El {} es {}.",
                long_date(lang, date),
                weekday_name(lang, date.weekday())
            ),
            (Some(date), _) => format!(
                "{} is a {}.",
                long_date(lang, date),
                weekday_name(lang, date.weekday())
            ),
            (None, "es") => format!(
                "Hoy es {}, {}.",
                weekday_name(lang, today.weekday()),
                long_date(lang, today)
            ),
            (None, _) => format!(
                "Today is {}, {}.",
                weekday_name(lang, today.weekday()),
                long_date(lang, today)
            ),
        };
        Ok(SkillOutcome::reply(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::testing::{entity, request};
    use parley_core::Language;

    fn skill() -> DateSkill {
        DateSkill::new(descriptor(), FixedOffset::east_opt(0).unwrap())
    }

    #[tokio::test]
    async fn test_today_in_spanish() {
        let out = skill().handle(&request("qué día es hoy", INTENT)).await.unwrap();
        assert_eq!(out.response, "Hoy es viernes, 1 de mayo de 2026.");
    }

    #[tokio::test]
    async fn test_today_in_english() {
        let mut req = request("what day is it", INTENT);
        req.language = Language::en();
        let out = skill().handle(&req).await.unwrap();
        assert_eq!(out.response, "Today is Friday, May 1, 2026.");
    }

    #[tokio::test]
    async fn test_mentioned_date() {
        let mut req = request("qué día es el 3 de mayo", INTENT);
        req.entities = vec![entity(EntityLabel::Date, "2026-05-03", 14, 23)];
        let out = skill().handle(&req).await.unwrap();
        assert_eq!(out.response, "El 3 de mayo de 2026 es domingo.");
    }
}
