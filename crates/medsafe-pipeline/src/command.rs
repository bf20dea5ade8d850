//! Collaborators backed by external processes.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::collaborator::{
    Collaborator, CollaboratorError, EvaluationRequest, InferenceRequest, SampleRequest,
    TranscriptRequest,
};
use crate::settings::CollaboratorCommands;

/// Lines of stderr kept in an error report.
const STDERR_TAIL_LINES: usize = 20;

/// Runs each collaborator as a child process built from a command template.
///
/// A collaborator succeeds when its process exits with status 0. The child is
/// killed if the invocation is cancelled or times out.
pub struct CommandCollaborator {
    commands: CollaboratorCommands,
}

impl CommandCollaborator {
    pub fn new(commands: CollaboratorCommands) -> Self {
        Self { commands }
    }

    async fn run(
        &self,
        collaborator: &'static str,
        template: &[String],
        vars: &[(&str, String)],
    ) -> Result<(), CollaboratorError> {
        let argv = expand_template(collaborator, template, vars)?;
        let (program, args) = argv
            .split_first()
            .ok_or(CollaboratorError::EmptyCommand { collaborator })?;

        debug!(collaborator, command = %argv.join(" "), "invoking collaborator");
        let start = Instant::now();

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CollaboratorError::Spawn {
                collaborator,
                program: program.clone(),
                source,
            })?;

        let timeout_secs = self.commands.timeout_secs;
        let waited = if timeout_secs > 0 {
            tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
                .await
                .map_err(|_| CollaboratorError::TimedOut {
                    collaborator,
                    timeout_secs,
                })?
        } else {
            child.wait_with_output().await
        };
        let output = waited.map_err(|e| CollaboratorError::Failed {
            collaborator,
            message: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            debug!(collaborator, "{}", line);
        }
        debug!(
            collaborator,
            duration_ms = start.elapsed().as_millis() as u64,
            "collaborator finished"
        );

        if output.status.success() {
            Ok(())
        } else {
            Err(CollaboratorError::Exited {
                collaborator,
                exit_code: output.status.code().unwrap_or(-1),
                stderr: stderr_tail(&String::from_utf8_lossy(&output.stderr)),
            })
        }
    }
}

#[async_trait]
impl Collaborator for CommandCollaborator {
    async fn sample(&self, request: &SampleRequest) -> Result<(), CollaboratorError> {
        let vars = [
            ("output", request.output_path.display().to_string()),
            ("case_count", request.case_count.to_string()),
            ("seed", request.seed.to_string()),
            ("name", request.name.clone()),
        ];
        self.run("sample", &self.commands.sample, &vars).await
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<(), CollaboratorError> {
        let vars = [
            ("test_set", request.test_set.display().to_string()),
            ("model", request.model.to_string()),
            ("output", request.output_path.display().to_string()),
            ("variant", request.variant.to_string()),
            ("temperature", format!("{:?}", request.temperature)),
        ];
        self.run("inference", &self.commands.inference, &vars).await
    }

    async fn evaluate(&self, request: &EvaluationRequest) -> Result<(), CollaboratorError> {
        let vars = [
            ("test_set", request.test_set.display().to_string()),
            ("predictions", request.predictions.display().to_string()),
            ("model", request.model.to_string()),
            ("model_version", request.model_version.clone()),
            ("output", request.output_path.display().to_string()),
        ];
        self.run("evaluation", &self.commands.evaluation, &vars).await
    }

    async fn transcript(&self, request: &TranscriptRequest) -> Result<(), CollaboratorError> {
        let vars = [
            ("test_set", request.test_set.display().to_string()),
            ("predictions", request.predictions.display().to_string()),
            ("model", request.model.to_string()),
            ("output", request.output_path.display().to_string()),
        ];
        self.run("transcript", &self.commands.transcript, &vars).await
    }
}

/// Substitute `{name}` placeholders in every argument of `template`.
///
/// Braces that do not enclose an identifier (e.g. inline JSON) are kept
/// verbatim; an identifier with no value is an error.
pub fn expand_template(
    collaborator: &'static str,
    template: &[String],
    vars: &[(&str, String)],
) -> Result<Vec<String>, CollaboratorError> {
    template
        .iter()
        .map(|arg| expand_arg(collaborator, arg, vars))
        .collect()
}

fn expand_arg(
    collaborator: &'static str,
    arg: &str,
    vars: &[(&str, String)],
) -> Result<String, CollaboratorError> {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder(&after[..close]) => {
                let name = &after[..close];
                let value = vars
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| value)
                    .ok_or_else(|| CollaboratorError::UnknownPlaceholder {
                        collaborator,
                        placeholder: name.to_string(),
                    })?;
                out.push_str(value);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn is_placeholder(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
