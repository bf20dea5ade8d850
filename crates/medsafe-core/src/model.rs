//! Model identifiers and their filesystem-safe form.

use std::fmt;

use serde::Serialize;

use crate::error::ConfigError;

/// Characters replaced by `-` when a model identifier is used in a file name.
const UNSAFE_PATH_CHARS: [char; 3] = ['/', '\\', ':'];

/// Namespaced model identifier, e.g. `provider/model-name`.
///
/// The original form is what collaborators and reports see; the sanitized
/// form is only ever derived through [`ModelId::sanitized`], so artifact
/// paths computed at write time and read time always agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Parse a raw identifier, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::BlankModelId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe token used in artifact names (`acme/model-x` → `acme-model-x`).
    pub fn sanitized(&self) -> String {
        self.0.replace(UNSAFE_PATH_CHARS, "-")
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
