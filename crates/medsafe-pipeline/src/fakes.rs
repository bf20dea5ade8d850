//! In-process fake collaborator (testing only)
//!
//! `RecordingCollaborator` writes small deterministic artifacts to the
//! requested output paths and records every invocation, so tests can assert
//! exactly which collaborators ran and with what inputs.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::collaborator::{
    Collaborator, CollaboratorError, EvaluationRequest, InferenceRequest, SampleRequest,
    TranscriptRequest,
};

/// One recorded invocation. Carries the test-set name or the model identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Sample(String),
    Infer(String),
    Evaluate(String),
    Transcript(String),
}

/// Fake collaborator with per-model failure injection.
#[derive(Debug, Default)]
pub struct RecordingCollaborator {
    calls: Mutex<Vec<Call>>,
    inference_requests: Mutex<Vec<InferenceRequest>>,
    evaluation_requests: Mutex<Vec<EvaluationRequest>>,
    fail_sample: bool,
    fail_inference: HashSet<String>,
    fail_evaluation: HashSet<String>,
    silent_inference: HashSet<String>,
}

impl RecordingCollaborator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the sampling collaborator fail.
    pub fn fail_sample(mut self) -> Self {
        self.fail_sample = true;
        self
    }

    /// Make inference fail for `model`.
    pub fn fail_inference(mut self, model: &str) -> Self {
        self.fail_inference.insert(model.to_string());
        self
    }

    /// Make evaluation fail for `model`.
    pub fn fail_evaluation(mut self, model: &str) -> Self {
        self.fail_evaluation.insert(model.to_string());
        self
    }

    /// Report inference success for `model` without writing any output.
    pub fn silent_inference(mut self, model: &str) -> Self {
        self.silent_inference.insert(model.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_inference(&self) -> Option<InferenceRequest> {
        self.inference_requests.lock().unwrap().last().cloned()
    }

    pub fn last_evaluation(&self) -> Option<EvaluationRequest> {
        self.evaluation_requests.lock().unwrap().last().cloned()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Evaluation artifact written when no summary was configured for a model.
pub fn default_summary(model: &str, version: &str) -> Value {
    json!({
        "model": model,
        "version": version,
        "cases": 10,
        "total_attempted": 10,
        "safety_pass_rate": 0.9,
        "safety": {
            "missed_escalations": 1,
            "overconfident_wrong": 0,
            "unsafe_reassurance": 0
        },
        "effectiveness": { "top1_recall": 0.5, "top3_recall": 0.8 },
        "informational": { "overdiagnosis": 2 },
        "format_failures": 0,
        "format_failure_details": []
    })
}

async fn write(
    collaborator: &'static str,
    path: &Path,
    body: &str,
) -> Result<(), CollaboratorError> {
    tokio::fs::write(path, body)
        .await
        .map_err(|e| CollaboratorError::Failed {
            collaborator,
            message: e.to_string(),
        })
}

fn injected(collaborator: &'static str) -> CollaboratorError {
    CollaboratorError::Exited {
        collaborator,
        exit_code: 1,
        stderr: "injected failure".to_string(),
    }
}

#[async_trait]
impl Collaborator for RecordingCollaborator {
    async fn sample(&self, request: &SampleRequest) -> Result<(), CollaboratorError> {
        self.record(Call::Sample(request.name.clone()));
        if self.fail_sample {
            return Err(injected("sample"));
        }

        let cases: Vec<Value> = (0..request.case_count)
            .map(|i| json!({ "case_id": format!("case-{:04}", i) }))
            .collect();
        let body = json!({
            "metadata": {
                "test_set_name": request.name,
                "seed": request.seed,
                "sampled_cases": request.case_count,
            },
            "cases": cases,
        });
        write("sample", &request.output_path, &body.to_string()).await
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<(), CollaboratorError> {
        let model = request.model.to_string();
        self.record(Call::Infer(model.clone()));
        self.inference_requests.lock().unwrap().push(request.clone());

        if self.fail_inference.contains(&model) {
            return Err(injected("inference"));
        }
        if self.silent_inference.contains(&model) {
            return Ok(());
        }

        let body = json!({
            "metadata": {
                "model": model,
                "prompt_variant": request.variant,
                "temperature": request.temperature,
            },
            "predictions": [],
        });
        write("inference", &request.output_path, &body.to_string()).await
    }

    async fn evaluate(&self, request: &EvaluationRequest) -> Result<(), CollaboratorError> {
        let model = request.model.to_string();
        self.record(Call::Evaluate(model.clone()));
        self.evaluation_requests.lock().unwrap().push(request.clone());

        if self.fail_evaluation.contains(&model) {
            return Err(injected("evaluation"));
        }

        let body = default_summary(&model, &request.model_version);
        write("evaluation", &request.output_path, &body.to_string()).await
    }

    async fn transcript(&self, request: &TranscriptRequest) -> Result<(), CollaboratorError> {
        let model = request.model.to_string();
        self.record(Call::Transcript(model.clone()));

        let body = format!("# Transcript: {}\n", model);
        write("transcript", &request.output_path, &body).await
    }
}
