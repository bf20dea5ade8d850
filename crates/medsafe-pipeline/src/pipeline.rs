//! Benchmark run orchestration.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use medsafe_core::{
    emit_run_finished, emit_run_started, model_span, CacheError, ModelId, RunConfig, TaskCache,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{warn, Instrument};
use uuid::Uuid;

use crate::collaborator::{Collaborator, CollaboratorError};
use crate::materializer::{MaterializedTestSet, TestSetMaterializer};
use crate::report::{aggregate, ModelResult};
use crate::runner::StageRunner;
use crate::stage::{ModelRun, StageRecord};

/// What a failed stage does to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failed stage; models not yet started never run.
    #[default]
    FailFast,

    /// Record the failure and keep going with remaining stages and models.
    Continue,
}

/// Tunables of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub policy: FailurePolicy,

    /// Maximum number of models processed concurrently.
    pub jobs: usize,

    /// Provenance tag for evaluation; the variant name when unset.
    pub model_version: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::FailFast,
            jobs: 1,
            model_version: None,
        }
    }
}

/// Errors that end a run before any model is processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("test set {name} could not be materialized: {source}")]
    TestSet {
        name: String,
        #[source]
        source: CollaboratorError,
    },

    #[error("artifact cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Result of a complete benchmark run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    pub config: RunConfig,
    pub policy: FailurePolicy,
    pub test_set: MaterializedTestSet,

    /// Stage records of every model that ran, in configured order.
    pub models: Vec<ModelRun>,

    /// Whether fail-fast stopped the run before every model was processed.
    pub aborted: bool,

    /// Aggregated evaluation results, one per configured model.
    pub results: Vec<ModelResult>,
}

impl RunReport {
    /// Whether every processed stage succeeded and no model was cut short.
    pub fn success(&self) -> bool {
        !self.aborted && !self.models.iter().any(|m| m.failed())
    }

    /// Failed stages across all models.
    pub fn failures(&self) -> Vec<(&ModelId, &StageRecord)> {
        self.models
            .iter()
            .flat_map(|m| {
                m.stages
                    .iter()
                    .filter(|s| s.is_failed())
                    .map(move |s| (&m.model, s))
            })
            .collect()
    }

    /// Number of collaborator invocations made by this run.
    pub fn invocations(&self) -> usize {
        let sampling = usize::from(self.test_set.created);
        sampling + self.models.iter().map(|m| m.invocations()).sum::<usize>()
    }
}

/// Benchmark pipeline orchestrator.
pub struct BenchPipeline {
    cache: Arc<dyn TaskCache>,
    collaborator: Arc<dyn Collaborator>,
    options: PipelineOptions,
}

impl BenchPipeline {
    pub fn new(
        cache: Arc<dyn TaskCache>,
        collaborator: Arc<dyn Collaborator>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            cache,
            collaborator,
            options,
        }
    }

    /// Execute a benchmark run.
    ///
    /// The test set is materialized once before any model starts. Each
    /// distinct model then runs its stage chain independently, up to
    /// `jobs` models at a time. Results are aggregated from the cache
    /// afterwards, also when fail-fast stopped the run early.
    pub async fn run(&self, config: &RunConfig) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let variant = config.variant();
        let policy = self.options.policy;

        emit_run_started(
            &run_id.to_string(),
            variant,
            config.case_count(),
            config.model_count(),
        );

        let test_set = TestSetMaterializer::new(self.cache.clone(), self.collaborator.clone())
            .materialize(config.case_count(), config.model_count(), config.seed())
            .await?;

        let model_version = self
            .options
            .model_version
            .clone()
            .unwrap_or_else(|| variant.name().to_string());

        let runner = StageRunner::new(
            self.cache.clone(),
            self.collaborator.clone(),
            config.clone(),
            test_set.path.clone(),
            model_version,
        );

        let mut seen = HashSet::new();
        let mut distinct = Vec::new();
        for model in config.models() {
            if seen.insert(model.clone()) {
                distinct.push(model.clone());
            } else {
                warn!(model = %model, "model listed more than once; running it once");
            }
        }

        let mut tasks = stream::iter(distinct.into_iter().enumerate())
            .map(|(index, model)| {
                let runner = runner.clone();
                let span = model_span(&model, variant);
                async move { (index, runner.run_model(&model, policy).await) }.instrument(span)
            })
            .buffer_unordered(self.options.jobs.max(1));

        let mut finished = Vec::new();
        let mut aborted = false;
        while let Some((index, run)) = tasks.next().await {
            let stop = run.failed() && policy == FailurePolicy::FailFast;
            if stop {
                warn!(model = %run.model, "stage failed; stopping run");
            }
            finished.push((index, run));

            if stop {
                aborted = true;
                break;
            }
        }
        // Dropping the stream cancels models still in flight.
        drop(tasks);

        finished.sort_by_key(|(index, _)| *index);
        let models: Vec<ModelRun> = finished.into_iter().map(|(_, run)| run).collect();

        let results = aggregate(self.cache.as_ref(), config).await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
            config: config.clone(),
            policy,
            test_set,
            models,
            aborted,
            results,
        };
        emit_run_finished(&run_id.to_string(), duration_ms, report.success());

        Ok(report)
    }
}
