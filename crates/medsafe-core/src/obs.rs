//! Structured observability hooks for the harness lifecycle.
//!
//! Every stage decision (cache hit, run, skip, failure) is emitted as an
//! event carrying `event = "stage.*"`, the stage name and the artifact key.
//! Per-model work runs inside [`model_span`] so concurrent models stay
//! distinguishable in the log.

use tracing::{error, info, warn, Span};

use crate::artifact::ArtifactKey;
use crate::cache::ArtifactDigest;
use crate::model::ModelId;
use crate::variant::Variant;

/// Span tagging all events of one model's stage chain.
pub fn model_span(model: &ModelId, variant: Variant) -> Span {
    tracing::info_span!("medsafe.model", model = %model, variant = %variant)
}

/// Emit event: run started.
pub fn emit_run_started(run_id: &str, variant: Variant, case_count: u32, model_count: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        variant = %variant,
        case_count = case_count,
        model_count = model_count,
    );
}

/// Emit event: run finished with duration and overall status.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, success: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        success = success,
    );
}

/// Emit event: artifact already present, collaborator not invoked.
pub fn emit_stage_cached(stage: &str, artifact: &ArtifactKey) {
    info!(event = "stage.cached", stage = stage, artifact = %artifact, "already exists, skipping");
}

pub fn emit_stage_started(stage: &str, artifact: &ArtifactKey) {
    info!(event = "stage.started", stage = stage, artifact = %artifact);
}

pub fn emit_stage_completed(
    stage: &str,
    artifact: &ArtifactKey,
    digest: &ArtifactDigest,
    duration_ms: u64,
) {
    info!(
        event = "stage.completed",
        stage = stage,
        artifact = %artifact,
        digest = %digest.short(),
        duration_ms = duration_ms,
    );
}

/// Emit event: stage skipped because an upstream artifact is missing (warning level).
pub fn emit_stage_skipped(stage: &str, artifact: &ArtifactKey, reason: &str) {
    warn!(event = "stage.skipped", stage = stage, artifact = %artifact, reason = reason);
}

/// Emit event: collaborator or cache failure (error level).
pub fn emit_stage_failed(stage: &str, artifact: &ArtifactKey, error: &dyn std::fmt::Display) {
    error!(event = "stage.failed", stage = stage, artifact = %artifact, error = %error);
}
