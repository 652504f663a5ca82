/// Failure of an external media service call, classified for retry.
/// Transient failures (network drops, rate limits, upstream 5xx) are
/// retried with backoff; permanent failures (bad audio, unsupported
/// input) fail the stage immediately.
#[derive(Debug, thiserror::Error)]
pub enum MediaServiceError {
    #[error("transient: {0}")]
    Transient(String),
    #[error("permanent: {0}")]
    Permanent(String),
}

impl MediaServiceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, MediaServiceError::Transient(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MediaServiceError::Transient(_) => "transient",
            MediaServiceError::Permanent(_) => "permanent",
        }
    }
}
