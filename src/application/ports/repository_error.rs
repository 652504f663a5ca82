#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Compare-and-set lost: the record was not in the expected state,
    /// or the artifact slot was already written.
    #[error("conflict: {0}")]
    Conflict(String),
}
