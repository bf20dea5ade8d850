//! External collaborator contracts.
//!
//! Sampling, inference, scoring and transcript rendering are owned by other
//! programs. The harness only hands them input paths and an output path and
//! checks whether they succeeded.

use std::path::PathBuf;

use async_trait::async_trait;
use medsafe_core::{ModelId, Variant};
use serde::Serialize;
use thiserror::Error;

/// Inputs of the test-case sampling collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRequest {
    pub output_path: PathBuf,
    pub case_count: u32,
    pub seed: u64,
    pub name: String,
}

/// Inputs of the model inference collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceRequest {
    pub test_set: PathBuf,
    pub model: ModelId,
    pub output_path: PathBuf,
    pub variant: Variant,
    pub temperature: f64,
}

/// Inputs of the scoring collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRequest {
    pub test_set: PathBuf,
    pub predictions: PathBuf,
    pub model: ModelId,
    /// Provenance tag recorded in the evaluation artifact.
    pub model_version: String,
    pub output_path: PathBuf,
}

/// Inputs of the transcript renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptRequest {
    pub test_set: PathBuf,
    pub predictions: PathBuf,
    pub model: ModelId,
    pub output_path: PathBuf,
}

/// Errors from collaborator invocations.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{collaborator} command is empty")]
    EmptyCommand { collaborator: &'static str },

    #[error("unknown placeholder {{{placeholder}}} in {collaborator} command")]
    UnknownPlaceholder {
        collaborator: &'static str,
        placeholder: String,
    },

    #[error("failed to spawn {collaborator} ({program}): {source}")]
    Spawn {
        collaborator: &'static str,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{collaborator} exited with code {exit_code}: {stderr}")]
    Exited {
        collaborator: &'static str,
        exit_code: i32,
        stderr: String,
    },

    #[error("{collaborator} timed out after {timeout_secs} seconds")]
    TimedOut {
        collaborator: &'static str,
        timeout_secs: u64,
    },

    #[error("{collaborator} failed: {message}")]
    Failed {
        collaborator: &'static str,
        message: String,
    },
}

/// The four external programs the harness drives.
///
/// Each call must leave its artifact at the request's `output_path` on
/// success. A returned error means the artifact must not be trusted.
#[async_trait]
pub trait Collaborator: Send + Sync {
    async fn sample(&self, request: &SampleRequest) -> Result<(), CollaboratorError>;

    async fn infer(&self, request: &InferenceRequest) -> Result<(), CollaboratorError>;

    async fn evaluate(&self, request: &EvaluationRequest) -> Result<(), CollaboratorError>;

    async fn transcript(&self, request: &TranscriptRequest) -> Result<(), CollaboratorError>;
}
