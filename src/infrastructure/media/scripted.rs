use std::sync::Arc;

use async_trait::async_trait;

use crate::application::ports::{
    AudioExtractor, MediaServiceError, SpeechSynthesizer, SpeechToText, Translator, VideoRemuxer,
};
use crate::application::services::MediaServices;
use crate::domain::{Language, VoiceStyle};

use super::aligner::UniformCaptionAligner;

const SCRIPTED_TRANSCRIPT: &str =
    "Welcome to this video. Today we will look at the dubbing pipeline.";

/// Minimal 16 kHz mono 16-bit PCM WAV of silence, used where scripted
/// services need to produce structurally valid audio.
pub(crate) fn silent_wav(seconds: f64) -> Vec<u8> {
    let sample_rate: u32 = 16_000;
    let byte_rate: u32 = sample_rate * 2;
    let data_len = (seconds * byte_rate as f64) as u32 & !1;
    let riff_len = 36 + data_len;

    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&riff_len.to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes()); // block align
    wav.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);
    wav
}

/// Stand-in media services for scaffold mode and tests: deterministic,
/// instant, no external processes or network.
pub struct ScriptedAudioExtractor;

#[async_trait]
impl AudioExtractor for ScriptedAudioExtractor {
    async fn extract_audio(&self, _video: &[u8]) -> Result<Vec<u8>, MediaServiceError> {
        Ok(silent_wav(4.0))
    }
}

pub struct ScriptedSpeechToText;

#[async_trait]
impl SpeechToText for ScriptedSpeechToText {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _source_language: Language,
    ) -> Result<String, MediaServiceError> {
        Ok(SCRIPTED_TRANSCRIPT.to_string())
    }
}

pub struct ScriptedTranslator;

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_language: Language,
        target_language: Language,
    ) -> Result<String, MediaServiceError> {
        Ok(format!("[{}] {}", target_language, text))
    }
}

pub struct ScriptedSpeechSynthesizer;

#[async_trait]
impl SpeechSynthesizer for ScriptedSpeechSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        _target_language: Language,
        _voice_style: VoiceStyle,
    ) -> Result<Vec<u8>, MediaServiceError> {
        let words = text.split_whitespace().count().max(1);
        Ok(silent_wav(words as f64 / 2.5))
    }
}

pub struct ScriptedVideoRemuxer;

#[async_trait]
impl VideoRemuxer for ScriptedVideoRemuxer {
    async fn remux(&self, video: &[u8], _audio: &[u8]) -> Result<Vec<u8>, MediaServiceError> {
        Ok(video.to_vec())
    }
}

/// The full scripted service set, with the real aligner so caption
/// timing behaves the same as in production.
pub fn scripted_services() -> MediaServices {
    MediaServices {
        audio_extractor: Arc::new(ScriptedAudioExtractor),
        speech_to_text: Arc::new(ScriptedSpeechToText),
        translator: Arc::new(ScriptedTranslator),
        speech_synthesizer: Arc::new(ScriptedSpeechSynthesizer),
        caption_aligner: Arc::new(UniformCaptionAligner::new()),
        video_remuxer: Arc::new(ScriptedVideoRemuxer),
    }
}
