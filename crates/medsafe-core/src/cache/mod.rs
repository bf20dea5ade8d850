pub mod fs;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use sha2::{Digest as Sha2Digest, Sha256};
use thiserror::Error;

use crate::artifact::ArtifactKey;

/// SHA-256 fingerprint of a completed artifact.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactDigest([u8; 32]);

impl ArtifactDigest {
    /// Compute the SHA-256 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self(bytes)
    }

    /// Hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Finish an incremental SHA-256 computation.
    pub(crate) fn from_hasher(hasher: Sha256) -> Self {
        Self(hasher.finalize().into())
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for ArtifactDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ArtifactDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtifactDigest({})", self.short())
    }
}

impl Serialize for ArtifactDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Errors from task cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("collaborator reported success but wrote nothing for {key} (expected {path:?})")]
    StagedMissing { key: String, path: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Idempotent task cache keyed by deterministic artifact keys.
///
/// Presence of a completed artifact is the only record that its task is
/// done. Producers never write the canonical location directly: they write
/// to a path from [`TaskCache::stage`], which [`TaskCache::complete`]
/// publishes atomically and at most once per key.
#[async_trait]
pub trait TaskCache: Send + Sync {
    /// Canonical location of the artifact for `key`, handed to downstream consumers.
    fn location(&self, key: &ArtifactKey) -> PathBuf;

    /// Whether a completed artifact exists for `key`.
    async fn has(&self, key: &ArtifactKey) -> Result<bool>;

    /// Reserve a unique staging path for a producer of `key`.
    async fn stage(&self, key: &ArtifactKey) -> Result<PathBuf>;

    /// Publish the staged artifact as the completed artifact for `key`.
    ///
    /// If another producer completed `key` first, the staged copy is
    /// discarded and the existing artifact is kept. Returns the digest of
    /// the artifact now present.
    async fn complete(&self, key: &ArtifactKey, staged: &Path) -> Result<ArtifactDigest>;

    /// Discard a staging path after a failed producer. Missing files are ignored.
    async fn abandon(&self, key: &ArtifactKey, staged: &Path) -> Result<()>;

    /// Read the completed artifact for `key`, or `None` if absent.
    async fn load(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>>;

    /// Digest of the completed artifact for `key`, or `None` if absent.
    ///
    /// Backends should hash without holding the whole artifact in memory.
    async fn digest(&self, key: &ArtifactKey) -> Result<Option<ArtifactDigest>>;
}
