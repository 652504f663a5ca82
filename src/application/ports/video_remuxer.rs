use async_trait::async_trait;

use super::MediaServiceError;

/// Replaces the audio track of the original video with the synthesized
/// one, producing the final dubbed container.
#[async_trait]
pub trait VideoRemuxer: Send + Sync {
    async fn remux(&self, video: &[u8], audio: &[u8]) -> Result<Vec<u8>, MediaServiceError>;
}
