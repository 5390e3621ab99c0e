//! Declarative skills: fixed responses for the intents a manifest declares.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::SkillError;
use crate::manifest::SkillManifest;
use crate::skill::{Skill, SkillDescriptor, SkillOutcome, SkillRequest};

pub struct ReplySkill {
    descriptor: SkillDescriptor,
    responses: BTreeMap<String, String>,
}

impl ReplySkill {
    pub fn from_manifest(manifest: &SkillManifest) -> Result<Self, SkillError> {
        let invalid = |reason: &str| SkillError::Manifest {
            path: manifest.name.clone(),
            reason: reason.to_string(),
        };
        if manifest.intents.is_empty() {
            return Err(invalid("reply skills must declare at least one intent"));
        }
        if manifest.responses.is_empty() {
            return Err(invalid("reply skills need at least one response"));
        }

        let mut descriptor =
            SkillDescriptor::new(manifest.name.clone()).description(manifest.description.clone());
        for intent in &manifest.intents {
            descriptor = descriptor.intent(intent.clone());
        }
        Ok(Self {
            descriptor,
            responses: manifest.responses.clone(),
        })
    }

    /// Template for `language`, falling back to English, then to any.
    fn template(&self, language: &str) -> &str {
        self.responses
            .get(language)
            .or_else(|| self.responses.get("en"))
            .or_else(|| self.responses.values().next())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[async_trait]
impl Skill for ReplySkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, request: &SkillRequest) -> Result<bool, SkillError> {
        Ok(self.descriptor.declares(&request.intent.label))
    }

    async fn handle(&self, request: &SkillRequest) -> Result<SkillOutcome, SkillError> {
        let text = self
            .template(request.language.code())
            .replace("{text}", &request.text);
        Ok(SkillOutcome::reply(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::testing::request;
    use parley_core::Language;
    use parley_nlu::IntentLabel;

    fn manifest() -> SkillManifest {
        let mut m = SkillManifest::builtin("reply");
        m.name = "echo".to_string();
        m.intents = vec![IntentLabel::new("echo").keyword("en", "echo")];
        m.responses.insert("en".into(), "You said: {text}".into());
        m.responses.insert("es".into(), "Dijiste: {text}".into());
        m
    }

    #[tokio::test]
    async fn test_template_per_language() {
        let skill = ReplySkill::from_manifest(&manifest()).unwrap();
        let req = request("eco", "echo");
        assert!(skill.can_handle(&req).unwrap());
        assert_eq!(skill.handle(&req).await.unwrap().response, "Dijiste: eco");

        let mut req = request("bonjour", "echo");
        req.language = Language::new("fr").unwrap();
        assert_eq!(skill.handle(&req).await.unwrap().response, "You said: bonjour");
    }

    #[test]
    fn test_requires_intents_and_responses() {
        let mut m = manifest();
        m.responses.clear();
        assert!(ReplySkill::from_manifest(&m).is_err());

        let mut m = manifest();
        m.intents.clear();
        assert!(ReplySkill::from_manifest(&m).is_err());
    }
}
