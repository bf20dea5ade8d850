use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::warn;
use uuid::Uuid;

use super::{ArtifactDigest, CacheError, Result, TaskCache};
use crate::artifact::{ArtifactKey, ArtifactLayout};

const DIGEST_CHUNK: usize = 64 * 1024;

/// SHA-256 of a file, read in fixed-size chunks.
async fn digest_file(path: &Path) -> Result<ArtifactDigest> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; DIGEST_CHUNK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(ArtifactDigest::from_hasher(hasher))
}

/// Filesystem-backed task cache over an [`ArtifactLayout`].
///
/// Staging files live next to their canonical path as
/// `.<file name>.partial-<uuid>`, so publishing is a same-directory link.
pub struct FsTaskCache {
    layout: ArtifactLayout,
}

impl FsTaskCache {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }
}

#[async_trait]
impl TaskCache for FsTaskCache {
    fn location(&self, key: &ArtifactKey) -> PathBuf {
        self.layout.path(key)
    }

    async fn has(&self, key: &ArtifactKey) -> Result<bool> {
        Ok(fs::try_exists(self.location(key)).await?)
    }

    async fn stage(&self, key: &ArtifactKey) -> Result<PathBuf> {
        let dir = self.layout.dir(key);
        fs::create_dir_all(&dir).await?;
        Ok(dir.join(format!(".{}.partial-{}", key.file_name(), Uuid::new_v4())))
    }

    async fn complete(&self, key: &ArtifactKey, staged: &Path) -> Result<ArtifactDigest> {
        let path = self.location(key);

        if !fs::try_exists(staged).await? {
            return Err(CacheError::StagedMissing {
                key: key.to_string(),
                path: staged.to_path_buf(),
            });
        }

        // Linking fails if the target exists, which makes publication write-once.
        match fs::hard_link(staged, &path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!(artifact = %key, "artifact completed concurrently; keeping existing copy");
            }
            Err(e) => return Err(e.into()),
        }
        fs::remove_file(staged).await?;

        digest_file(&path).await
    }

    async fn abandon(&self, _key: &ArtifactKey, staged: &Path) -> Result<()> {
        match fs::remove_file(staged).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
        match fs::read(self.location(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Io(e)),
        }
    }

    async fn digest(&self, key: &ArtifactKey) -> Result<Option<ArtifactDigest>> {
        match digest_file(&self.location(key)).await {
            Ok(digest) => Ok(Some(digest)),
            Err(CacheError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
