//! Harness settings: artifact directories and collaborator commands.
//!
//! Settings come from built-in defaults, optionally overridden by a TOML
//! file. Command templates are argv vectors; `{placeholder}` tokens are
//! substituted per invocation (see [`crate::command`]).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use medsafe_core::ArtifactLayout;
use serde::{Deserialize, Serialize};

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// Command templates for the four collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollaboratorCommands {
    /// Placeholders: `{output}`, `{case_count}`, `{seed}`, `{name}`.
    pub sample: Vec<String>,

    /// Placeholders: `{test_set}`, `{model}`, `{output}`, `{variant}`, `{temperature}`.
    pub inference: Vec<String>,

    /// Placeholders: `{test_set}`, `{predictions}`, `{model}`, `{model_version}`, `{output}`.
    pub evaluation: Vec<String>,

    /// Placeholders: `{test_set}`, `{predictions}`, `{model}`, `{output}`.
    pub transcript: Vec<String>,

    /// Timeout per invocation in seconds (0 = none).
    pub timeout_secs: u64,
}

impl Default for CollaboratorCommands {
    fn default() -> Self {
        Self {
            sample: argv(&[
                "python", "-m", "scripts.sample_test_set",
                "--out", "{output}",
                "--num-cases", "{case_count}",
                "--seed", "{seed}",
                "--name", "{name}",
            ]),
            inference: argv(&[
                "python", "-m", "inference.run_inference",
                "--cases", "{test_set}",
                "--model", "{model}",
                "--out", "{output}",
                "--prompt-variant", "{variant}",
                "--temperature", "{temperature}",
            ]),
            evaluation: argv(&[
                "python", "-m", "evaluator.cli",
                "--cases", "{test_set}",
                "--predictions", "{predictions}",
                "--model-name", "{model}",
                "--model-version", "{model_version}",
                "--out", "{output}",
            ]),
            transcript: argv(&[
                "python", "-m", "scripts.generate_transcript",
                "--cases", "{test_set}",
                "--predictions", "{predictions}",
                "--model", "{model}",
                "--out", "{output}",
            ]),
            timeout_secs: 0,
        }
    }
}

/// Top-level settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessSettings {
    /// Root of the test-set store.
    pub data_dir: PathBuf,

    /// Root of the per-variant result directories.
    pub results_dir: PathBuf,

    /// Provenance tag passed to the evaluator. Defaults to the variant name.
    pub model_version: Option<String>,

    pub collaborators: CollaboratorCommands,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            results_dir: PathBuf::from("results"),
            model_version: None,
            collaborators: CollaboratorCommands::default(),
        }
    }
}

impl HarnessSettings {
    /// Parse settings from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("parse harness settings")
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read settings file {:?}", path))?;
        Self::from_toml_str(&raw).with_context(|| format!("invalid settings file {:?}", path))
    }

    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.data_dir, &self.results_dir)
    }
}
