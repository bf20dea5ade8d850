//! Run configuration.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::ConfigError;
use crate::model::ModelId;
use crate::variant::Variant;

/// Seed handed to the sampling collaborator. Fixed so that a case count
/// alone determines the test set.
pub const DEFAULT_SEED: u64 = 42;

/// Sampling temperature for inference; zero keeps predictions reproducible.
pub const INFERENCE_TEMPERATURE: f64 = 0.0;

/// Validated, immutable description of one harness invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    case_count: u32,
    variant: Variant,
    models: Vec<ModelId>,
    seed: u64,
}

impl RunConfig {
    /// Build a configuration from a case count, a variant and raw model identifiers.
    ///
    /// Duplicate models are kept so the report lists every entry; the
    /// pipeline runs each distinct model once. Distinct models whose
    /// sanitized forms coincide are rejected, since they would resolve to
    /// the same artifacts.
    pub fn new<I, S>(case_count: u32, variant: Variant, models: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if case_count == 0 {
            return Err(ConfigError::InvalidCaseCount(case_count));
        }

        let models = models
            .into_iter()
            .map(|raw| ModelId::parse(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        if models.is_empty() {
            return Err(ConfigError::NoModels);
        }

        let mut by_artifact_name: HashMap<String, &ModelId> = HashMap::new();
        for model in &models {
            let sanitized = model.sanitized();
            match by_artifact_name.get(&sanitized) {
                Some(first) if *first != model => {
                    return Err(ConfigError::ArtifactNameCollision {
                        first: first.to_string(),
                        second: model.to_string(),
                        sanitized,
                    });
                }
                Some(_) => {}
                None => {
                    by_artifact_name.insert(sanitized, model);
                }
            }
        }

        Ok(Self {
            case_count,
            variant,
            models,
            seed: DEFAULT_SEED,
        })
    }

    pub fn case_count(&self) -> u32 {
        self.case_count
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn models(&self) -> &[ModelId] {
        &self.models
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_config() {
        let config = RunConfig::new(10, Variant::Baseline, ["acme/model-a"]).unwrap();
        assert_eq!(config.case_count(), 10);
        assert_eq!(config.variant(), Variant::Baseline);
        assert_eq!(config.model_count(), 1);
        assert_eq!(config.seed(), DEFAULT_SEED);
        assert_eq!(config.models()[0].as_str(), "acme/model-a");
    }

    #[test]
    fn test_empty_model_list_rejected() {
        let models: Vec<String> = Vec::new();
        assert_eq!(
            RunConfig::new(10, Variant::Baseline, models),
            Err(ConfigError::NoModels)
        );
    }

    #[test]
    fn test_zero_case_count_rejected() {
        assert_eq!(
            RunConfig::new(0, Variant::Baseline, ["acme/a"]),
            Err(ConfigError::InvalidCaseCount(0))
        );
    }

    #[test]
    fn test_blank_model_rejected() {
        assert_eq!(
            RunConfig::new(5, Variant::Guardrails, ["acme/a", ""]),
            Err(ConfigError::BlankModelId)
        );
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        let config = RunConfig::new(5, Variant::Baseline, ["b/x", "a/y", "b/x"]).unwrap();
        let names: Vec<_> = config.models().iter().map(|m| m.as_str()).collect();
        assert_eq!(names, vec!["b/x", "a/y", "b/x"]);
    }

    #[test]
    fn test_sanitized_collision_rejected() {
        assert_eq!(
            RunConfig::new(5, Variant::Baseline, ["acme/x", "acme-x"]),
            Err(ConfigError::ArtifactNameCollision {
                first: "acme/x".to_string(),
                second: "acme-x".to_string(),
                sanitized: "acme-x".to_string(),
            })
        );
        assert!(matches!(
            RunConfig::new(5, Variant::Baseline, ["a/b", "other/c", "a:b"]),
            Err(ConfigError::ArtifactNameCollision { .. })
        ));
    }

    #[test]
    fn test_exact_duplicates_do_not_collide() {
        let config = RunConfig::new(5, Variant::Baseline, ["acme/x", " acme/x"]).unwrap();
        assert_eq!(config.model_count(), 2);
    }
}
