use async_trait::async_trait;

use crate::domain::CaptionTrack;

use super::MediaServiceError;

/// Produces a timed caption track for the translated text against the
/// synthesized audio. Implementations must return a sorted,
/// non-overlapping sequence.
#[async_trait]
pub trait CaptionAligner: Send + Sync {
    async fn align(&self, text: &str, audio: &[u8]) -> Result<CaptionTrack, MediaServiceError>;
}
