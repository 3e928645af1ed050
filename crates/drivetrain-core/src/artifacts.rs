//! Artifact store and index attachment seams used by the reconciler.

use async_trait::async_trait;

use crate::Result;

/// Ingests bytes and hands back an identifier once server-side processing finished.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload `bytes` as `name`; resolves only after the artifact is processed.
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<String>;

    /// Delete an artifact. `Error::NotFound` when it is already gone.
    async fn delete(&self, artifact_id: &str) -> Result<()>;
}

/// Attaches artifacts to named index collections.
#[async_trait]
pub trait IndexAttachment: Send + Sync {
    async fn attach(&self, index_id: &str, artifact_id: &str) -> Result<()>;

    /// Detach an artifact. `Error::NotFound` when it is not attached.
    async fn detach(&self, index_id: &str, artifact_id: &str) -> Result<()>;
}
