use async_trait::async_trait;
use reqwest::multipart;

use crate::application::ports::{MediaServiceError, SpeechToText};
use crate::domain::Language;

use super::classify_status;

/// Speech-to-text against a Whisper-compatible transcription API.
pub struct WhisperApiTranscriber {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl WhisperApiTranscriber {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait]
impl SpeechToText for WhisperApiTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        source_language: Language,
    ) -> Result<String, MediaServiceError> {
        let url = format!("{}/audio/transcriptions", self.base_url);

        let file_part = multipart::Part::bytes(audio.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| MediaServiceError::Permanent(format!("mime: {}", e)))?;

        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("language", source_language.as_code())
            .text("response_format", "text")
            .part("file", file_part);

        tracing::debug!(model = %self.model, language = %source_language, "Sending audio for transcription");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaServiceError::Transient(format!("request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(classify_status(status, "transcription", &body));
        }

        let transcript = response
            .text()
            .await
            .map_err(|e| MediaServiceError::Transient(format!("body: {}", e)))?;

        tracing::info!(chars = transcript.len(), "Transcription completed");

        Ok(transcript.trim().to_string())
    }
}
