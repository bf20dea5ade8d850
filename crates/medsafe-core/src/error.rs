//! Configuration error taxonomy.

/// Errors raised while resolving a run configuration.
///
/// All of these are reported before any collaborator is invoked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("case count must be a positive integer, got {0}")]
    InvalidCaseCount(u32),

    #[error("unknown prompt variant '{value}'; valid options: {valid}")]
    UnknownVariant { value: String, valid: String },

    #[error("at least one model identifier is required")]
    NoModels,

    #[error("model identifier must not be blank")]
    BlankModelId,

    #[error("models '{first}' and '{second}' would share artifacts named '{sanitized}'")]
    ArtifactNameCollision {
        first: String,
        second: String,
        sanitized: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_variant_lists_options() {
        let err = ConfigError::UnknownVariant {
            value: "spicy".to_string(),
            valid: "baseline, guardrails".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("spicy"));
        assert!(msg.contains("baseline, guardrails"));
    }

    #[test]
    fn test_collision_names_both_models() {
        let err = ConfigError::ArtifactNameCollision {
            first: "acme/x".to_string(),
            second: "acme-x".to_string(),
            sanitized: "acme-x".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "models 'acme/x' and 'acme-x' would share artifacts named 'acme-x'"
        );
    }

    #[test]
    fn test_no_models_display() {
        assert!(ConfigError::NoModels
            .to_string()
            .contains("at least one model"));
    }
}
