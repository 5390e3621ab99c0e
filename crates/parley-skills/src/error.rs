//! Error types for skills and skill discovery.

use parley_core::ParleyError;

/// Errors from skills, manifests and the registry.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("skill {skill} failed: {reason}")]
    Failed { skill: String, reason: String },
    #[error("bad skill manifest {path}: {reason}")]
    Manifest { path: String, reason: String },
    #[error("unknown skill kind: {0}")]
    UnknownKind(String),
    #[error("duplicate skill name: {0}")]
    DuplicateName(String),
    #[error("forecast unavailable: {0}")]
    Forecast(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SkillError {
    pub fn failed(skill: &str, reason: impl Into<String>) -> Self {
        SkillError::Failed {
            skill: skill.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<SkillError> for ParleyError {
    fn from(err: SkillError) -> Self {
        ParleyError::Skill(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_error_display() {
        let err = SkillError::failed("weather", "timeout");
        assert_eq!(err.to_string(), "skill weather failed: timeout");

        let err = SkillError::UnknownKind("music".to_string());
        assert_eq!(err.to_string(), "unknown skill kind: music");

        let err = SkillError::DuplicateName("time".to_string());
        assert_eq!(err.to_string(), "duplicate skill name: time");

        let err = SkillError::Manifest {
            path: "skills/x/skill.toml".to_string(),
            reason: "missing field `kind`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "bad skill manifest skills/x/skill.toml: missing field `kind`"
        );
    }

    #[test]
    fn test_conversion_to_parley_error() {
        let err: ParleyError = SkillError::Forecast("offline".to_string()).into();
        assert!(matches!(err, ParleyError::Skill(_)));
    }
}
