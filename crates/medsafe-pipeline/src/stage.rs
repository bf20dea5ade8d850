//! Per-stage outcomes and per-model run records.

use std::path::PathBuf;

use medsafe_core::{ArtifactDigest, ModelId, StageKind};
use serde::Serialize;

/// Decision taken for one (model, stage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    /// Artifact already present; collaborator not invoked.
    Cached,

    /// Collaborator ran and its artifact was published.
    Completed,

    /// An upstream artifact is missing; nothing was run.
    Skipped { reason: String },

    /// Collaborator or cache failure.
    Failed { error: String },
}

/// Result of a stage decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: StageKind,

    /// Canonical artifact location.
    pub artifact: PathBuf,

    pub status: StageStatus,

    /// Digest of the artifact, when one is present after the stage.
    pub digest: Option<ArtifactDigest>,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl StageRecord {
    /// Whether the stage's artifact is available (cached or freshly produced).
    pub fn is_done(&self) -> bool {
        matches!(self.status, StageStatus::Cached | StageStatus::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, StageStatus::Failed { .. })
    }

    /// Whether a collaborator was invoked for this stage.
    pub fn invoked(&self) -> bool {
        matches!(
            self.status,
            StageStatus::Completed | StageStatus::Failed { .. }
        )
    }
}

/// Stage records of one model, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelRun {
    pub model: ModelId,
    pub stages: Vec<StageRecord>,
}

impl ModelRun {
    pub fn new(model: ModelId) -> Self {
        Self {
            model,
            stages: Vec::new(),
        }
    }

    pub fn failed(&self) -> bool {
        self.stages.iter().any(|s| s.is_failed())
    }

    pub fn stage(&self, kind: StageKind) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.stage == kind)
    }

    /// Number of collaborator invocations made for this model.
    pub fn invocations(&self) -> usize {
        self.stages.iter().filter(|s| s.invoked()).count()
    }
}
