//! Shared test-set materialization.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use medsafe_core::{
    emit_stage_cached, emit_stage_completed, emit_stage_failed, emit_stage_started,
    test_set_name, ArtifactDigest, ArtifactKey, TaskCache,
};
use serde::Serialize;

use crate::collaborator::{Collaborator, SampleRequest};
use crate::pipeline::PipelineError;

const STAGE: &str = "test_set";

/// The test set every model of a run is scored against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedTestSet {
    pub name: String,
    pub path: PathBuf,

    /// Whether the sampling collaborator ran in this invocation.
    pub created: bool,

    pub digest: ArtifactDigest,
}

/// Creates the seeded test set on first use and reuses it afterwards.
pub struct TestSetMaterializer {
    cache: Arc<dyn TaskCache>,
    collaborator: Arc<dyn Collaborator>,
}

impl TestSetMaterializer {
    pub fn new(cache: Arc<dyn TaskCache>, collaborator: Arc<dyn Collaborator>) -> Self {
        Self {
            cache,
            collaborator,
        }
    }

    /// Ensure the test set for `case_count` exists.
    ///
    /// `model_count` only appears in the artifact name; sampling depends on
    /// `case_count` and `seed` alone. Any sampling failure is fatal and
    /// leaves no artifact behind.
    pub async fn materialize(
        &self,
        case_count: u32,
        model_count: usize,
        seed: u64,
    ) -> Result<MaterializedTestSet, PipelineError> {
        let start = Instant::now();
        let key = ArtifactKey::test_set(case_count, model_count);
        let name = test_set_name(case_count, model_count);
        let path = self.cache.location(&key);

        if let Some(digest) = self.cache.digest(&key).await? {
            emit_stage_cached(STAGE, &key);
            return Ok(MaterializedTestSet {
                name,
                path,
                created: false,
                digest,
            });
        }

        let staged = self.cache.stage(&key).await?;
        emit_stage_started(STAGE, &key);

        let request = SampleRequest {
            output_path: staged.clone(),
            case_count,
            seed,
            name: name.clone(),
        };
        if let Err(source) = self.collaborator.sample(&request).await {
            emit_stage_failed(STAGE, &key, &source);
            self.cache.abandon(&key, &staged).await?;
            return Err(PipelineError::TestSet { name, source });
        }

        let digest = match self.cache.complete(&key, &staged).await {
            Ok(digest) => digest,
            Err(e) => {
                emit_stage_failed(STAGE, &key, &e);
                self.cache.abandon(&key, &staged).await?;
                return Err(e.into());
            }
        };
        emit_stage_completed(STAGE, &key, &digest, start.elapsed().as_millis() as u64);

        Ok(MaterializedTestSet {
            name,
            path,
            created: true,
            digest,
        })
    }
}
