use async_trait::async_trait;

use super::MediaServiceError;

/// Pulls the audio track out of an uploaded video container.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract_audio(&self, video: &[u8]) -> Result<Vec<u8>, MediaServiceError>;
}
