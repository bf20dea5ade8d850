//! MedSafe Core
//!
//! Domain types shared by the benchmark harness:
//! - Run configuration, prompt variants and model identifiers
//! - Canonical artifact keys and the on-disk layout they resolve to
//! - The idempotent task cache that records which artifacts are done
//! - Tracing setup and structured stage events

pub mod artifact;
pub mod cache;
pub mod config;
pub mod error;
pub mod fakes;
pub mod model;
pub mod obs;
pub mod summary;
pub mod telemetry;
pub mod variant;

pub use artifact::{test_set_name, ArtifactKey, ArtifactLayout, StageKind};
pub use cache::fs::FsTaskCache;
pub use cache::{ArtifactDigest, CacheError, TaskCache};
pub use config::{RunConfig, DEFAULT_SEED, INFERENCE_TEMPERATURE};
pub use error::ConfigError;
pub use model::ModelId;
pub use obs::{
    emit_run_finished, emit_run_started, emit_stage_cached, emit_stage_completed,
    emit_stage_failed, emit_stage_skipped, emit_stage_started, model_span,
};
pub use summary::{Effectiveness, EvaluationSummary, Informational, SafetyCounts};
pub use telemetry::init_tracing;
pub use variant::Variant;

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
