use std::fmt;

use super::job_id::JobId;

/// Opaque reference to a stored artifact. Wraps the storage-relative
/// path so callers never build raw paths by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    /// Reference for an artifact belonging to a job.
    pub fn for_job(job_id: &JobId, name: &str) -> Self {
        Self(format!("{}/{}", job_id.as_uuid(), name))
    }

    /// Reference into the content-addressed cache namespace.
    pub fn cached(signature: &str) -> Self {
        Self(format!("cache/{}", signature))
    }

    pub fn from_raw(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
