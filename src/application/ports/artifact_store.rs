use std::io;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::domain::ArtifactRef;

/// Durable storage for uploads and stage outputs. Contents must survive
/// an executor restart so interrupted jobs can resume from their last
/// recorded artifact.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put_stream(
        &self,
        artifact: &ArtifactRef,
        stream: BoxStream<'_, Result<Bytes, io::Error>>,
    ) -> Result<u64, ArtifactStoreError>;

    async fn put(&self, artifact: &ArtifactRef, data: &[u8]) -> Result<(), ArtifactStoreError>;

    async fn fetch(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, ArtifactStoreError>;

    async fn exists(&self, artifact: &ArtifactRef) -> Result<bool, ArtifactStoreError>;

    async fn delete(&self, artifact: &ArtifactRef) -> Result<(), ArtifactStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactStoreError {
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
