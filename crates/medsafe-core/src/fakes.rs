//! In-memory fakes for the task cache (testing only)
//!
//! `MemoryTaskCache` satisfies the `TaskCache` contract without touching the
//! canonical layout: completed artifacts live in a `HashMap`, and staging
//! paths point into the system temp directory so real producers can still
//! write to them.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::artifact::{ArtifactKey, ArtifactLayout};
use crate::cache::{ArtifactDigest, CacheError, Result, TaskCache};

/// In-memory task cache backed by a `HashMap<ArtifactKey, bytes>`.
#[derive(Debug)]
pub struct MemoryTaskCache {
    layout: ArtifactLayout,
    store: Mutex<HashMap<ArtifactKey, Vec<u8>>>,
}

impl Default for MemoryTaskCache {
    fn default() -> Self {
        Self {
            layout: ArtifactLayout::new("memory/data", "memory/results"),
            store: Mutex::new(HashMap::new()),
        }
    }
}

impl MemoryTaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a completed artifact.
    pub fn insert(&self, key: ArtifactKey, data: impl Into<Vec<u8>>) {
        self.store.lock().unwrap().insert(key, data.into());
    }

    /// Number of completed artifacts.
    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TaskCache for MemoryTaskCache {
    fn location(&self, key: &ArtifactKey) -> PathBuf {
        self.layout.path(key)
    }

    async fn has(&self, key: &ArtifactKey) -> Result<bool> {
        Ok(self.store.lock().unwrap().contains_key(key))
    }

    async fn stage(&self, key: &ArtifactKey) -> Result<PathBuf> {
        Ok(std::env::temp_dir().join(format!(
            "medsafe-{}-{}",
            Uuid::new_v4(),
            key.file_name()
        )))
    }

    async fn complete(&self, key: &ArtifactKey, staged: &Path) -> Result<ArtifactDigest> {
        let data = match tokio::fs::read(staged).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CacheError::StagedMissing {
                    key: key.to_string(),
                    path: staged.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        tokio::fs::remove_file(staged).await?;

        let mut store = self.store.lock().unwrap();
        let current = store.entry(key.clone()).or_insert(data);
        Ok(ArtifactDigest::compute(current))
    }

    async fn abandon(&self, _key: &ArtifactKey, staged: &Path) -> Result<()> {
        match tokio::fs::remove_file(staged).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
        Ok(self.store.lock().unwrap().get(key).cloned())
    }

    async fn digest(&self, key: &ArtifactKey) -> Result<Option<ArtifactDigest>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .get(key)
            .map(|data| ArtifactDigest::compute(data)))
    }
}
