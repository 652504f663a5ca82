use async_trait::async_trait;

use crate::domain::Language;

use super::MediaServiceError;

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_language: Language,
        target_language: Language,
    ) -> Result<String, MediaServiceError>;
}
