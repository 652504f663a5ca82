use async_trait::async_trait;
use serde::Serialize;

use crate::application::ports::{MediaServiceError, SpeechSynthesizer};
use crate::domain::{Language, VoiceStyle};

use super::classify_status;

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    language: &'a str,
    voice: &'a str,
    format: &'a str,
}

/// Text-to-speech over a JSON HTTP API returning raw audio bytes.
pub struct HttpSpeechSynthesizer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl HttpSpeechSynthesizer {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        target_language: Language,
        voice_style: VoiceStyle,
    ) -> Result<Vec<u8>, MediaServiceError> {
        let url = format!("{}/synthesize", self.base_url);
        let request = SynthesizeRequest {
            text,
            language: target_language.as_code(),
            voice: voice_style.as_str(),
            format: "wav",
        };

        tracing::debug!(
            language = %target_language,
            voice = %voice_style,
            chars = text.len(),
            "Requesting speech synthesis"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| MediaServiceError::Transient(format!("request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(classify_status(status, "synthesis", &body));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| MediaServiceError::Transient(format!("body: {}", e)))?;

        tracing::info!(bytes = audio.len(), "Speech synthesis completed");

        Ok(audio.to_vec())
    }
}
