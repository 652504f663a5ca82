use std::sync::Arc;

use crate::application::services::MediaServices;
use crate::presentation::config::{MediaProviderSetting, MediaSettings};

use super::aligner::UniformCaptionAligner;
use super::ffmpeg::{FfmpegAudioExtractor, FfmpegVideoRemuxer};
use super::scripted::scripted_services;
use super::translate_api::HttpTranslator;
use super::tts_api::HttpSpeechSynthesizer;
use super::whisper_api::WhisperApiTranscriber;

pub struct MediaServiceFactory;

impl MediaServiceFactory {
    pub fn create(settings: &MediaSettings) -> MediaServices {
        match settings.provider {
            MediaProviderSetting::Scripted => scripted_services(),
            MediaProviderSetting::Remote => MediaServices {
                audio_extractor: Arc::new(FfmpegAudioExtractor::new(&settings.ffmpeg_binary)),
                speech_to_text: Arc::new(WhisperApiTranscriber::new(
                    settings.transcription.api_key.clone(),
                    settings.transcription.base_url.clone(),
                    settings.transcription.model.clone(),
                )),
                translator: Arc::new(HttpTranslator::new(
                    settings.translation.api_key.clone(),
                    settings.translation.base_url.clone(),
                )),
                speech_synthesizer: Arc::new(HttpSpeechSynthesizer::new(
                    settings.synthesis.api_key.clone(),
                    settings.synthesis.base_url.clone(),
                )),
                caption_aligner: Arc::new(UniformCaptionAligner::new()),
                video_remuxer: Arc::new(FfmpegVideoRemuxer::new(&settings.ffmpeg_binary)),
            },
        }
    }
}
