use async_trait::async_trait;

use crate::domain::{Language, VoiceStyle};

use super::MediaServiceError;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        target_language: Language,
        voice_style: VoiceStyle,
    ) -> Result<Vec<u8>, MediaServiceError>;
}
