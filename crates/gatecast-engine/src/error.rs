use thiserror::Error;

use crate::post_model::PostId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failures a registry caller is expected to match on.
pub enum RegistryError {
    #[error("post {0} not found")]
    NotFound(PostId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Outcome of a single failed call against the messaging platform.
pub enum PlatformError {
    #[error("channel call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("platform rejected request ({code}): {description}")]
    Api { code: u16, description: String },
    #[error("invalid platform response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    pub fn api(code: u16, description: impl Into<String>) -> Self {
        Self::Api {
            code,
            description: description.into(),
        }
    }
}
