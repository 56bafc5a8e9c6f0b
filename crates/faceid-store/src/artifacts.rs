//! Filesystem artifact store for thumbnail blobs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::{ArtifactStore, StoreError};

/// Writes each artifact as a uuid-named file under a root directory and
/// returns the file name as the artifact reference.
#[derive(Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute path of a previously stored artifact.
    pub fn path_for(&self, artifact_ref: &str) -> PathBuf {
        self.root.join(artifact_ref)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, bytes: Vec<u8>, extension: &str) -> Result<String, StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let name = format!("{}.{extension}", Uuid::new_v4());
        tokio::fs::write(self.root.join(&name), &bytes).await?;
        tracing::debug!(artifact = %name, size = bytes.len(), "artifact stored");
        Ok(name)
    }
}
