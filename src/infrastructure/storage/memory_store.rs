use std::collections::HashMap;
use std::io;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::RwLock;

use crate::application::ports::{ArtifactStore, ArtifactStoreError};
use crate::domain::ArtifactRef;

/// In-memory artifact store for tests and scaffold mode.
#[derive(Default)]
pub struct InMemoryArtifactStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put_stream(
        &self,
        artifact: &ArtifactRef,
        mut stream: BoxStream<'_, Result<Bytes, io::Error>>,
    ) -> Result<u64, ArtifactStoreError> {
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk.map_err(ArtifactStoreError::Io)?);
        }
        let total = data.len() as u64;
        self.objects
            .write()
            .await
            .insert(artifact.as_str().to_string(), data);
        Ok(total)
    }

    async fn put(&self, artifact: &ArtifactRef, data: &[u8]) -> Result<(), ArtifactStoreError> {
        self.objects
            .write()
            .await
            .insert(artifact.as_str().to_string(), data.to_vec());
        Ok(())
    }

    async fn fetch(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, ArtifactStoreError> {
        self.objects
            .read()
            .await
            .get(artifact.as_str())
            .cloned()
            .ok_or_else(|| ArtifactStoreError::NotFound(artifact.to_string()))
    }

    async fn exists(&self, artifact: &ArtifactRef) -> Result<bool, ArtifactStoreError> {
        Ok(self.objects.read().await.contains_key(artifact.as_str()))
    }

    async fn delete(&self, artifact: &ArtifactRef) -> Result<(), ArtifactStoreError> {
        self.objects.write().await.remove(artifact.as_str());
        Ok(())
    }
}
