//! Idempotent per-model stage execution.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use medsafe_core::{
    emit_stage_cached, emit_stage_completed, emit_stage_failed, emit_stage_skipped,
    emit_stage_started, ArtifactDigest, ArtifactKey, ModelId, RunConfig, StageKind, TaskCache,
    INFERENCE_TEMPERATURE,
};

use crate::collaborator::{Collaborator, EvaluationRequest, InferenceRequest, TranscriptRequest};
use crate::pipeline::FailurePolicy;
use crate::stage::{ModelRun, StageRecord, StageStatus};

/// Runs inference → evaluation → transcript for one model at a time.
///
/// Each stage is a cache hit if its artifact exists, is skipped if it needs
/// predictions that are absent, and otherwise invokes its collaborator.
#[derive(Clone)]
pub struct StageRunner {
    cache: Arc<dyn TaskCache>,
    collaborator: Arc<dyn Collaborator>,
    config: RunConfig,
    test_set: PathBuf,
    model_version: String,
}

impl StageRunner {
    pub fn new(
        cache: Arc<dyn TaskCache>,
        collaborator: Arc<dyn Collaborator>,
        config: RunConfig,
        test_set: PathBuf,
        model_version: String,
    ) -> Self {
        Self {
            cache,
            collaborator,
            config,
            test_set,
            model_version,
        }
    }

    fn key(&self, model: &ModelId, stage: StageKind) -> ArtifactKey {
        ArtifactKey::stage(
            self.config.variant(),
            model,
            self.config.case_count(),
            stage,
        )
    }

    /// Run every stage for `model` in dependency order.
    ///
    /// Under [`FailurePolicy::FailFast`] the chain stops at the first failed
    /// stage. Under [`FailurePolicy::Continue`] later stages are still
    /// attempted; those that need missing predictions are skipped.
    pub async fn run_model(&self, model: &ModelId, policy: FailurePolicy) -> ModelRun {
        let mut run = ModelRun::new(model.clone());

        for stage in StageKind::ORDER {
            let record = self.run_stage(model, stage).await;
            let failed = record.is_failed();
            run.stages.push(record);

            if failed && policy == FailurePolicy::FailFast {
                break;
            }
        }

        run
    }

    /// Decide and execute a single stage.
    pub async fn run_stage(&self, model: &ModelId, stage: StageKind) -> StageRecord {
        let start = Instant::now();
        let key = self.key(model, stage);
        let artifact = self.cache.location(&key);

        let record = |status: StageStatus, digest: Option<ArtifactDigest>| StageRecord {
            stage,
            artifact: artifact.clone(),
            status,
            digest,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        let fail = |error: String| {
            emit_stage_failed(stage.name(), &key, &error);
            record(StageStatus::Failed { error }, None)
        };

        match self.cache.digest(&key).await {
            Ok(Some(digest)) => {
                emit_stage_cached(stage.name(), &key);
                return record(StageStatus::Cached, Some(digest));
            }
            Ok(None) => {}
            Err(e) => return fail(e.to_string()),
        }

        let predictions_key = self.key(model, StageKind::Inference);
        if stage.requires_predictions() {
            match self.cache.has(&predictions_key).await {
                Ok(true) => {}
                Ok(false) => {
                    let reason = format!("no predictions for {}", model);
                    emit_stage_skipped(stage.name(), &key, &reason);
                    return record(StageStatus::Skipped { reason }, None);
                }
                Err(e) => return fail(e.to_string()),
            }
        }

        let staged = match self.cache.stage(&key).await {
            Ok(path) => path,
            Err(e) => return fail(e.to_string()),
        };

        emit_stage_started(stage.name(), &key);
        let predictions = self.cache.location(&predictions_key);
        let outcome = match stage {
            StageKind::Inference => {
                self.collaborator
                    .infer(&InferenceRequest {
                        test_set: self.test_set.clone(),
                        model: model.clone(),
                        output_path: staged.clone(),
                        variant: self.config.variant(),
                        temperature: INFERENCE_TEMPERATURE,
                    })
                    .await
            }
            StageKind::Evaluation => {
                self.collaborator
                    .evaluate(&EvaluationRequest {
                        test_set: self.test_set.clone(),
                        predictions,
                        model: model.clone(),
                        model_version: self.model_version.clone(),
                        output_path: staged.clone(),
                    })
                    .await
            }
            StageKind::Transcript => {
                self.collaborator
                    .transcript(&TranscriptRequest {
                        test_set: self.test_set.clone(),
                        predictions,
                        model: model.clone(),
                        output_path: staged.clone(),
                    })
                    .await
            }
        };

        if let Err(e) = outcome {
            self.discard(&key, &staged).await;
            return fail(e.to_string());
        }

        match self.cache.complete(&key, &staged).await {
            Ok(digest) => {
                let done = record(StageStatus::Completed, Some(digest));
                emit_stage_completed(stage.name(), &key, &digest, done.duration_ms);
                done
            }
            Err(e) => {
                self.discard(&key, &staged).await;
                fail(e.to_string())
            }
        }
    }

    async fn discard(&self, key: &ArtifactKey, staged: &Path) {
        if let Err(e) = self.cache.abandon(key, staged).await {
            tracing::warn!(artifact = %key, error = %e, "failed to discard staged output");
        }
    }
}
