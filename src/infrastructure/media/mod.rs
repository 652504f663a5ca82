mod aligner;
mod factory;
mod ffmpeg;
mod scripted;
mod translate_api;
mod tts_api;
mod whisper_api;

pub use aligner::UniformCaptionAligner;
pub use factory::MediaServiceFactory;
pub use ffmpeg::{FfmpegAudioExtractor, FfmpegVideoRemuxer};
pub use scripted::{
    ScriptedAudioExtractor, ScriptedSpeechSynthesizer, ScriptedSpeechToText, ScriptedTranslator,
    ScriptedVideoRemuxer, scripted_services,
};
pub use translate_api::HttpTranslator;
pub use tts_api::HttpSpeechSynthesizer;
pub use whisper_api::WhisperApiTranscriber;

use crate::application::ports::MediaServiceError;

/// Maps an upstream HTTP status to the retry classification: rate
/// limits and server errors are worth retrying, other client errors are
/// not.
pub(crate) fn classify_status(
    status: reqwest::StatusCode,
    operation: &str,
    body: &str,
) -> MediaServiceError {
    if status.as_u16() == 429 || status.is_server_error() {
        MediaServiceError::Transient(format!("{} returned {}: {}", operation, status, body))
    } else {
        MediaServiceError::Permanent(format!("{} returned {}: {}", operation, status, body))
    }
}
