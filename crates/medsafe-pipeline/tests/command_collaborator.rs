//! Integration tests for process-backed collaborators.

use medsafe_core::{ModelId, Variant, INFERENCE_TEMPERATURE};
use medsafe_pipeline::{
    Collaborator, CollaboratorCommands, CollaboratorError, CommandCollaborator, EvaluationRequest,
    InferenceRequest, SampleRequest,
};
use std::path::PathBuf;

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

fn inference_request(output: PathBuf) -> InferenceRequest {
    InferenceRequest {
        test_set: PathBuf::from("data/test_sets/test-10cases-1models.json"),
        model: ModelId::parse("acme/model-a").expect("model"),
        output_path: output,
        variant: Variant::Guardrails,
        temperature: INFERENCE_TEMPERATURE,
    }
}

/// Test: placeholders are substituted and the collaborator writes its output
#[tokio::test]
async fn test_inference_command_writes_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("predictions.json");

    let commands = CollaboratorCommands {
        inference: vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf '%s %s %s' \"$1\" \"$2\" \"$3\" > \"$4\"".to_string(),
            "inference".to_string(),
            "{model}".to_string(),
            "{variant}".to_string(),
            "{temperature}".to_string(),
            "{output}".to_string(),
        ],
        ..CollaboratorCommands::default()
    };
    let collaborator = CommandCollaborator::new(commands);

    collaborator
        .infer(&inference_request(output.clone()))
        .await
        .expect("inference should succeed");

    let written = std::fs::read_to_string(&output).expect("output written");
    assert_eq!(written, "acme/model-a guardrails 0.0");
}

/// Test: sampling receives case count, seed and name
#[tokio::test]
async fn test_sample_command_arguments() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("test-set.json");

    let commands = CollaboratorCommands {
        sample: vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo \"$1 $2 $3\" > \"$4\"".to_string(),
            "sample".to_string(),
            "{case_count}".to_string(),
            "{seed}".to_string(),
            "{name}".to_string(),
            "{output}".to_string(),
        ],
        ..CollaboratorCommands::default()
    };

    CommandCollaborator::new(commands)
        .sample(&SampleRequest {
            output_path: output.clone(),
            case_count: 10,
            seed: 42,
            name: "test-10cases-1models".to_string(),
        })
        .await
        .expect("sampling should succeed");

    let written = std::fs::read_to_string(&output).expect("output written");
    assert_eq!(written.trim(), "10 42 test-10cases-1models");
}

/// Test: non-zero exit is a failure carrying the exit code and stderr
#[tokio::test]
async fn test_nonzero_exit_captured() {
    let commands = CollaboratorCommands {
        inference: sh("echo 'rate limited' >&2; exit 3"),
        ..CollaboratorCommands::default()
    };

    let err = CommandCollaborator::new(commands)
        .infer(&inference_request(PathBuf::from("/tmp/unused.json")))
        .await
        .expect_err("inference should fail");

    match err {
        CollaboratorError::Exited {
            collaborator,
            exit_code,
            stderr,
        } => {
            assert_eq!(collaborator, "inference");
            assert_eq!(exit_code, 3);
            assert_eq!(stderr, "rate limited");
        }
        other => panic!("expected Exited, got {other:?}"),
    }
}

/// Test: a collaborator exceeding its timeout is killed and reported
#[tokio::test]
async fn test_timeout() {
    let commands = CollaboratorCommands {
        evaluation: sh("sleep 5"),
        timeout_secs: 1,
        ..CollaboratorCommands::default()
    };

    let err = CommandCollaborator::new(commands)
        .evaluate(&EvaluationRequest {
            test_set: PathBuf::from("t.json"),
            predictions: PathBuf::from("p.json"),
            model: ModelId::parse("acme/a").expect("model"),
            model_version: "baseline".to_string(),
            output_path: PathBuf::from("e.json"),
        })
        .await
        .expect_err("evaluation should time out");

    assert!(matches!(
        err,
        CollaboratorError::TimedOut {
            collaborator: "evaluation",
            timeout_secs: 1
        }
    ));
}

/// Test: a missing program is a spawn failure
#[tokio::test]
async fn test_spawn_failure() {
    let commands = CollaboratorCommands {
        inference: vec!["/nonexistent/medsafe-inference".to_string()],
        ..CollaboratorCommands::default()
    };

    let err = CommandCollaborator::new(commands)
        .infer(&inference_request(PathBuf::from("/tmp/unused.json")))
        .await
        .expect_err("spawn should fail");

    assert!(matches!(err, CollaboratorError::Spawn { .. }));
    assert!(err.to_string().contains("/nonexistent/medsafe-inference"));
}

/// Test: unknown placeholders and empty commands are rejected before spawning
#[tokio::test]
async fn test_invalid_templates_rejected() {
    let unknown = CollaboratorCommands {
        inference: vec!["run".to_string(), "{predictions}".to_string()],
        ..CollaboratorCommands::default()
    };
    let err = CommandCollaborator::new(unknown)
        .infer(&inference_request(PathBuf::from("/tmp/unused.json")))
        .await
        .expect_err("template should be rejected");
    match err {
        CollaboratorError::UnknownPlaceholder { placeholder, .. } => {
            assert_eq!(placeholder, "predictions")
        }
        other => panic!("expected UnknownPlaceholder, got {other:?}"),
    }

    let empty = CollaboratorCommands {
        inference: Vec::new(),
        ..CollaboratorCommands::default()
    };
    let err = CommandCollaborator::new(empty)
        .infer(&inference_request(PathBuf::from("/tmp/unused.json")))
        .await
        .expect_err("empty command should be rejected");
    assert!(matches!(err, CollaboratorError::EmptyCommand { .. }));
}
