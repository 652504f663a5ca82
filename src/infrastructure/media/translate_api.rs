use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::ports::{MediaServiceError, Translator};
use crate::domain::Language;

use super::classify_status;

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    source: &'a str,
    target: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translation: String,
}

/// Machine translation over a JSON HTTP API.
pub struct HttpTranslator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl HttpTranslator {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: Language,
        target_language: Language,
    ) -> Result<String, MediaServiceError> {
        let url = format!("{}/translate", self.base_url);
        let request = TranslateRequest {
            text,
            source: source_language.as_code(),
            target: target_language.as_code(),
        };

        tracing::debug!(
            source = %source_language,
            target = %target_language,
            chars = text.len(),
            "Requesting translation"
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
            return Err(classify_status(status, "translation", &body));
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| MediaServiceError::Transient(format!("body: {}", e)))?;

        tracing::info!(chars = body.translation.len(), "Translation completed");

        Ok(body.translation)
    }
}
