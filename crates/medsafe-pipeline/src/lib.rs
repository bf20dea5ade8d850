//! MedSafe Pipeline - benchmark stage orchestration
//!
//! Provides the run orchestrator that:
//! - Materializes the shared, seeded test set exactly once
//! - Runs inference → evaluation → transcript per model, skipping cached artifacts
//! - Aggregates every model's evaluation artifact into a comparison report

pub mod collaborator;
pub mod command;
pub mod fakes;
pub mod materializer;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod settings;
pub mod stage;

// Re-export key types
pub use collaborator::{
    Collaborator, CollaboratorError, EvaluationRequest, InferenceRequest, SampleRequest,
    TranscriptRequest,
};
pub use command::CommandCollaborator;
pub use materializer::{MaterializedTestSet, TestSetMaterializer};
pub use pipeline::{BenchPipeline, FailurePolicy, PipelineError, PipelineOptions, RunReport};
pub use report::{
    aggregate, rank, render_results, render_run, write_report_json, ModelResult, ResultStatus,
};
pub use runner::StageRunner;
pub use settings::{CollaboratorCommands, HarnessSettings};
pub use stage::{ModelRun, StageRecord, StageStatus};
