//! Error types for lastvalue core.

use lastvalue_storage::{ConfigError, OpenError, StoreError};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in lastvalue core operations.
///
/// Missing keys and missing paths are not errors; they resolve to a null
/// value.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A topic does not have the `<kind>/<device>/<service>` shape.
    #[error("invalid topic: {topic:?}")]
    InvalidTopic {
        /// The rejected topic.
        topic: String,
    },

    /// A command response payload is not a response envelope.
    #[error("unexpected message in response topic {topic:?}: {source}")]
    InvalidResponse {
        /// Topic the payload arrived on.
        topic: String,
        /// Decoder error.
        source: serde_json::Error,
    },
}

impl CoreError {
    /// Creates an invalid topic error.
    pub fn invalid_topic(topic: impl Into<String>) -> Self {
        Self::InvalidTopic {
            topic: topic.into(),
        }
    }
}

impl From<OpenError> for CoreError {
    fn from(err: OpenError) -> Self {
        match err {
            OpenError::Config(e) => Self::Config(e),
            OpenError::Store(e) => Self::Store(e),
        }
    }
}
