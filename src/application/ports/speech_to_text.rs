use async_trait::async_trait;

use crate::domain::Language;

use super::MediaServiceError;

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
        source_language: Language,
    ) -> Result<String, MediaServiceError>;
}
