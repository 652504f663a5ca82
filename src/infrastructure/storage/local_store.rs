use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use object_store::local::LocalFileSystem;
use object_store::path::Path as StorePath;
use object_store::{MultipartUpload, ObjectStore, PutPayload};

use crate::application::ports::{ArtifactStore, ArtifactStoreError};
use crate::domain::ArtifactRef;

/// Filesystem-backed artifact store. Artifacts survive process
/// restarts, which is what lets an interrupted job resume from its last
/// recorded stage.
pub struct LocalArtifactStore {
    inner: Arc<LocalFileSystem>,
}

impl LocalArtifactStore {
    pub fn new(base_path: PathBuf) -> Result<Self, ArtifactStoreError> {
        std::fs::create_dir_all(&base_path).map_err(ArtifactStoreError::Io)?;
        let fs = LocalFileSystem::new_with_prefix(base_path)
            .map_err(|e| ArtifactStoreError::UploadFailed(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(fs),
        })
    }
}

#[async_trait::async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put_stream(
        &self,
        artifact: &ArtifactRef,
        mut stream: BoxStream<'_, Result<Bytes, io::Error>>,
    ) -> Result<u64, ArtifactStoreError> {
        let store_path = StorePath::from(artifact.as_str());
        let mut upload = self
            .inner
            .put_multipart(&store_path)
            .await
            .map_err(|e| ArtifactStoreError::UploadFailed(e.to_string()))?;

        let mut total_bytes: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    let _ = upload.abort().await;
                    return Err(ArtifactStoreError::Io(e));
                }
            };
            total_bytes += bytes.len() as u64;
            if let Err(e) = upload.put_part(PutPayload::from(bytes)).await {
                let _ = upload.abort().await;
                return Err(ArtifactStoreError::UploadFailed(e.to_string()));
            }
        }

        upload
            .complete()
            .await
            .map_err(|e| ArtifactStoreError::UploadFailed(e.to_string()))?;

        Ok(total_bytes)
    }

    async fn put(&self, artifact: &ArtifactRef, data: &[u8]) -> Result<(), ArtifactStoreError> {
        let store_path = StorePath::from(artifact.as_str());
        self.inner
            .put(&store_path, PutPayload::from(data.to_vec()))
            .await
            .map_err(|e| ArtifactStoreError::UploadFailed(e.to_string()))?;
        Ok(())
    }

    async fn fetch(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, ArtifactStoreError> {
        let store_path = StorePath::from(artifact.as_str());
        let result = self
            .inner
            .get(&store_path)
            .await
            .map_err(|e| ArtifactStoreError::NotFound(e.to_string()))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| ArtifactStoreError::DownloadFailed(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn exists(&self, artifact: &ArtifactRef) -> Result<bool, ArtifactStoreError> {
        let store_path = StorePath::from(artifact.as_str());
        match self.inner.head(&store_path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(ArtifactStoreError::DownloadFailed(e.to_string())),
        }
    }

    async fn delete(&self, artifact: &ArtifactRef) -> Result<(), ArtifactStoreError> {
        let store_path = StorePath::from(artifact.as_str());
        self.inner
            .delete(&store_path)
            .await
            .map_err(|e| ArtifactStoreError::DeleteFailed(e.to_string()))
    }
}
