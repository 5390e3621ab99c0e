//! Skills shipped with the assistant, and the factory that builds skills
//! from manifests.

pub mod date;
pub mod forecast;
pub mod help;
pub mod locale;
pub mod reminder;
pub mod reply;
pub mod reset;
pub mod time;
pub mod weather;

use std::sync::Arc;

use chrono::{FixedOffset, Local, Offset};

use crate::error::SkillError;
use crate::manifest::SkillManifest;
use crate::skill::{Skill, SkillDescriptor};
use forecast::ForecastProvider;

/// Kinds registered by [`SkillFactory::builtin_set`], in registration order.
pub const BUILTIN_KINDS: &[&str] = &["reset", "weather", "time", "date", "reminder", "help"];

/// Builds skill instances from manifests.
#[derive(Clone)]
pub struct SkillFactory {
    forecast: Arc<dyn ForecastProvider>,
    offset: FixedOffset,
}

impl SkillFactory {
    /// Factory using the host's current UTC offset for time and date answers.
    pub fn new(forecast: Arc<dyn ForecastProvider>) -> Self {
        Self {
            forecast,
            offset: Local::now().offset().fix(),
        }
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Offset the time and date skills answer in.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn create(&self, manifest: &SkillManifest) -> Result<Arc<dyn Skill>, SkillError> {
        let skill: Arc<dyn Skill> = match manifest.kind.as_str() {
            "weather" => Arc::new(weather::WeatherSkill::new(
                customize(weather::descriptor(), manifest),
                self.forecast.clone(),
            )),
            "time" => Arc::new(time::TimeSkill::new(
                customize(time::descriptor(), manifest),
                self.offset,
            )),
            "date" => Arc::new(date::DateSkill::new(
                customize(date::descriptor(), manifest),
                self.offset,
            )),
            "reminder" => Arc::new(reminder::ReminderSkill::new(customize(
                reminder::descriptor(),
                manifest,
            ))),
            "reset" => Arc::new(reset::ResetSkill::new(customize(
                reset::descriptor(),
                manifest,
            ))),
            "help" => Arc::new(help::HelpSkill::new(
                customize(help::descriptor(), manifest),
                manifest.option_bool("handle_unknown").unwrap_or(false),
            )),
            "reply" => Arc::new(reply::ReplySkill::from_manifest(manifest)?),
            other => return Err(SkillError::UnknownKind(other.to_string())),
        };
        Ok(skill)
    }

    /// One instance of every built-in kind with default settings.
    pub fn builtin_set(&self) -> Result<Vec<Arc<dyn Skill>>, SkillError> {
        BUILTIN_KINDS
            .iter()
            .map(|kind| self.create(&SkillManifest::builtin(kind)))
            .collect()
    }
}

/// Apply a manifest's name, description and extra intents to a built-in
/// descriptor.
fn customize(mut descriptor: SkillDescriptor, manifest: &SkillManifest) -> SkillDescriptor {
    descriptor.name = manifest.name.clone();
    if !manifest.description.is_empty() {
        descriptor.description = manifest.description.clone();
    }
    for intent in &manifest.intents {
        if !descriptor.declares(&intent.name) {
            descriptor.intents.push(intent.clone());
        }
    }
    descriptor
}


#[cfg(test)]
mod tests {
    use super::*;
    use forecast::OfflineForecast;
    use parley_nlu::IntentLabel;

    fn factory() -> SkillFactory {
        SkillFactory::new(Arc::new(OfflineForecast)).with_offset(FixedOffset::east_opt(0).unwrap())
    }

    #[test]
    fn test_builtin_set_order() {
        let names: Vec<String> = factory()
            .builtin_set()
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, BUILTIN_KINDS);
    }

    #[test]
    fn test_manifest_overrides_builtin() {
        let mut manifest = SkillManifest::builtin("weather");
        manifest.name = "clima".to_string();
        manifest.intents = vec![IntentLabel::new("get_forecast").keyword("en", "outlook")];
        let skill = factory().create(&manifest).unwrap();
        assert_eq!(skill.name(), "clima");
        assert!(skill.descriptor().declares(weather::INTENT));
        assert!(skill.descriptor().declares("get_forecast"));
    }

    #[test]
    fn test_unknown_kind() {
        let manifest = SkillManifest::builtin("music");
        assert!(matches!(
            factory().create(&manifest),
            Err(SkillError::UnknownKind(k)) if k == "music"
        ));
    }
}
