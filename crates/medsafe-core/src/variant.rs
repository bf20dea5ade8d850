//! Prompt variants applied uniformly to every model in a run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Named prompt configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Original system prompt without safety guardrails.
    #[default]
    Baseline,

    /// System prompt with safety-focused guardrails prepended.
    Guardrails,
}

impl Variant {
    /// Every variant, in registry order.
    pub const ALL: [Variant; 2] = [Variant::Baseline, Variant::Guardrails];

    /// Get the variant name as passed to collaborators and used in paths.
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Baseline => "baseline",
            Variant::Guardrails => "guardrails",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Variant::Baseline => "Original system prompt without safety guardrails",
            Variant::Guardrails => "System prompt with safety-focused guardrails prepended",
        }
    }

    fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|v| v.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| ConfigError::UnknownVariant {
                value: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}
