//! Weather lookups keyed on a LOCATION entity.
//!
//! Without a location the skill asks for the city and marks the `city` slot
//! as awaited; a later turn carrying a LOCATION completes the request even if
//! the classifier did not recognise it as a weather question.

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::EntityLabel;
use parley_dialog::ContextDelta;
use parley_nlu::IntentLabel;
use tracing::debug;

use super::forecast::ForecastProvider;
use super::locale::pick;
use crate::error::SkillError;
use crate::skill::{Skill, SkillDescriptor, SkillOutcome, SkillRequest};

pub const INTENT: &str = "get_weather";
pub const CITY_SLOT: &str = "city";

pub fn descriptor() -> SkillDescriptor {
    SkillDescriptor::new("weather")
        .description("Weather for a city")
        .capability("entity:LOCATION")
        .intent(
            IntentLabel::new(INTENT)
                .keyword("es", "tiempo")
                .keyword("es", "clima")
                .keyword("es", "llover")
                .keyword("es", "lluvia")
                .keyword("es", "temperatura")
                .keyword("es", "pronóstico")
                .keyword("en", "weather")
                .keyword("en", "forecast")
                .keyword("en", "rain")
                .keyword("en", "temperature")
                .example("es", "qué tiempo hace hoy")
                .example("es", "dime el clima en Panamá")
                .example("es", "va a llover mañana")
                .example("es", "cuál es la temperatura")
                .example("en", "what's the weather like today")
                .example("en", "will it rain tomorrow")
                .example("en", "weather in London"),
        )
}

pub struct WeatherSkill {
    descriptor: SkillDescriptor,
    provider: Arc<dyn ForecastProvider>,
}

impl WeatherSkill {
    pub fn new(descriptor: SkillDescriptor, provider: Arc<dyn ForecastProvider>) -> Self {
        Self {
            descriptor,
            provider,
        }
    }
}

#[async_trait]
impl Skill for WeatherSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, request: &SkillRequest) -> Result<bool, SkillError> {
        if self.descriptor.declares(&request.intent.label) {
            return Ok(true);
        }
        let follow_up = request.intent.is_unknown()
            && request.context.is_awaiting(CITY_SLOT)
            && request.first_entity(EntityLabel::Location).is_some();
        Ok(follow_up)
    }

    async fn handle(&self, request: &SkillRequest) -> Result<SkillOutcome, SkillError> {
        let Some(location) = request.first_entity(EntityLabel::Location) else {
            let ask = pick(
                &request.language,
                "¿Para qué ciudad te gustaría saber el clima?",
                "For which city would you like to know the weather?",
            );
            return Ok(SkillOutcome::new(ask, ContextDelta::new().await_slot(CITY_SLOT)));
        };

        let date = request
            .first_entity(EntityLabel::Date)
            .map(|e| e.value.as_str());
        debug!(city = %location.value, date = ?date, "Fetching forecast");
        let text = self
            .provider
            .forecast(&location.value, date, &request.language)
            .await?;

        let mut delta = ContextDelta::new();
        if request.context.slot(CITY_SLOT).is_some() {
            delta = delta.clear_slot(CITY_SLOT);
        }
        Ok(SkillOutcome::new(text, delta))
    }
}
