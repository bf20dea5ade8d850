//! Artifact keys and the canonical paths they resolve to.
//!
//! Layout:
//! - `<data_dir>/test_sets/test-{N}cases-{M}models.json`
//! - `<results_dir>/<variant>/<model>-{N}cases-predictions.json`
//! - `<results_dir>/<variant>/<model>-{N}cases-eval.json`
//! - `<results_dir>/<variant>/<model>-{N}cases-transcript.md`
//!
//! where `<model>` is the sanitized model identifier.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::ModelId;
use crate::variant::Variant;

/// Per-model pipeline stages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Model inference over the test set, producing predictions.
    Inference,

    /// Scoring predictions against the test set.
    Evaluation,

    /// Human-readable transcript of cases and predictions.
    Transcript,
}

impl StageKind {
    /// Dependency order of the per-model stages.
    pub const ORDER: [StageKind; 3] = [
        StageKind::Inference,
        StageKind::Evaluation,
        StageKind::Transcript,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Inference => "inference",
            StageKind::Evaluation => "evaluation",
            StageKind::Transcript => "transcript",
        }
    }

    /// Suffix of the artifact this stage writes.
    fn artifact_suffix(&self) -> &'static str {
        match self {
            StageKind::Inference => "predictions.json",
            StageKind::Evaluation => "eval.json",
            StageKind::Transcript => "transcript.md",
        }
    }

    /// Whether the stage consumes the predictions artifact.
    pub fn requires_predictions(&self) -> bool {
        !matches!(self, StageKind::Inference)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Deterministic content key of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactKey {
    TestSet {
        case_count: u32,
        model_count: usize,
    },
    Stage {
        variant: Variant,
        /// Sanitized model identifier.
        model: String,
        case_count: u32,
        stage: StageKind,
    },
}

impl ArtifactKey {
    pub fn test_set(case_count: u32, model_count: usize) -> Self {
        ArtifactKey::TestSet {
            case_count,
            model_count,
        }
    }

    pub fn stage(variant: Variant, model: &ModelId, case_count: u32, stage: StageKind) -> Self {
        ArtifactKey::Stage {
            variant,
            model: model.sanitized(),
            case_count,
            stage,
        }
    }

    /// File name of the artifact, without directory.
    pub fn file_name(&self) -> String {
        match self {
            ArtifactKey::TestSet {
                case_count,
                model_count,
            } => format!("{}.json", test_set_name(*case_count, *model_count)),
            ArtifactKey::Stage {
                model,
                case_count,
                stage,
                ..
            } => format!("{}-{}cases-{}", model, case_count, stage.artifact_suffix()),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKey::TestSet { .. } => write!(f, "test_sets/{}", self.file_name()),
            ArtifactKey::Stage { variant, .. } => write!(f, "{}/{}", variant, self.file_name()),
        }
    }
}

/// Descriptive name of the test set for `case_count` cases and `model_count` models.
pub fn test_set_name(case_count: u32, model_count: usize) -> String {
    format!("test-{}cases-{}models", case_count, model_count)
}

/// Root directories that artifact keys resolve under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    data_dir: PathBuf,
    results_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new(data_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            results_dir: results_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn test_sets_dir(&self) -> PathBuf {
        self.data_dir.join("test_sets")
    }

    pub fn variant_dir(&self, variant: Variant) -> PathBuf {
        self.results_dir.join(variant.name())
    }

    /// Directory holding the artifact for `key`.
    pub fn dir(&self, key: &ArtifactKey) -> PathBuf {
        match key {
            ArtifactKey::TestSet { .. } => self.test_sets_dir(),
            ArtifactKey::Stage { variant, .. } => self.variant_dir(*variant),
        }
    }

    /// Canonical path of `key`.
    pub fn path(&self, key: &ArtifactKey) -> PathBuf {
        self.dir(key).join(key.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(raw: &str) -> ModelId {
        ModelId::parse(raw).unwrap()
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(
            StageKind::ORDER,
            [StageKind::Inference, StageKind::Evaluation, StageKind::Transcript]
        );
        assert!(!StageKind::Inference.requires_predictions());
        assert!(StageKind::Evaluation.requires_predictions());
        assert!(StageKind::Transcript.requires_predictions());
    }

    #[test]
    fn test_test_set_path() {
        let layout = ArtifactLayout::new("data", "results");
        let key = ArtifactKey::test_set(10, 1);
        assert_eq!(
            layout.path(&key),
            PathBuf::from("data/test_sets/test-10cases-1models.json")
        );
        assert_eq!(test_set_name(10, 1), "test-10cases-1models");
        assert_eq!(layout.dir(&key), PathBuf::from("data/test_sets"));
    }

    #[test]
    fn test_stage_paths() {
        let layout = ArtifactLayout::new("data", "results");
        let m = model("acme/model-a");

        let predictions = ArtifactKey::stage(Variant::Baseline, &m, 10, StageKind::Inference);
        let eval = ArtifactKey::stage(Variant::Baseline, &m, 10, StageKind::Evaluation);
        let transcript = ArtifactKey::stage(Variant::Guardrails, &m, 10, StageKind::Transcript);

        assert_eq!(
            layout.path(&predictions),
            PathBuf::from("results/baseline/acme-model-a-10cases-predictions.json")
        );
        assert_eq!(
            layout.path(&eval),
            PathBuf::from("results/baseline/acme-model-a-10cases-eval.json")
        );
        assert_eq!(
            layout.path(&transcript),
            PathBuf::from("results/guardrails/acme-model-a-10cases-transcript.md")
        );
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = ArtifactKey::stage(Variant::Baseline, &model("acme/x"), 5, StageKind::Evaluation);
        let b = ArtifactKey::stage(Variant::Baseline, &model("acme/x"), 5, StageKind::Evaluation);
        assert_eq!(a, b);
    }

    #[test]
    fn test_keys_unique_per_variant_and_stage() {
        let m = model("acme/x");
        let a = ArtifactKey::stage(Variant::Baseline, &m, 5, StageKind::Evaluation);
        let b = ArtifactKey::stage(Variant::Guardrails, &m, 5, StageKind::Evaluation);
        let c = ArtifactKey::stage(Variant::Baseline, &m, 5, StageKind::Transcript);
        let d = ArtifactKey::stage(Variant::Baseline, &m, 6, StageKind::Evaluation);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_key_display() {
        let key =
            ArtifactKey::stage(Variant::Guardrails, &model("acme/x"), 5, StageKind::Inference);
        assert_eq!(key.to_string(), "guardrails/acme-x-5cases-predictions.json");
        assert_eq!(
            ArtifactKey::test_set(5, 2).to_string(),
            "test_sets/test-5cases-2models.json"
        );
    }
}
