//! Weather data seam.

use async_trait::async_trait;
use parley_core::Language;

use super::locale::pick;
use crate::error::SkillError;

/// Source of forecast text for the weather skill.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// A ready-to-speak forecast for `city`, optionally for an ISO `date`.
    async fn forecast(
        &self,
        city: &str,
        date: Option<&str>,
        language: &Language,
    ) -> Result<String, SkillError>;
}

/// Provider used when no weather service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineForecast;

#[async_trait]
impl ForecastProvider for OfflineForecast {
    async fn forecast(
        &self,
        city: &str,
        _date: Option<&str>,
        language: &Language,
    ) -> Result<String, SkillError> {
        let template = pick(
            language,
            "No tengo un servicio meteorológico configurado, así que no puedo consultar el clima en {city}.",
            "I don't have a weather service configured, so I can't check the weather in {city}.",
        );
        Ok(template.replace("{city}", city))
    }
}
