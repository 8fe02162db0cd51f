//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a [`crate::Store`] while reading or writing records.
///
/// Every variant is an I/O-class failure: "key not found" is never an
/// error, it is reported as [`crate::Lookup::NotFound`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The RocksDB engine behind a compaction store failed.
    #[cfg(feature = "compaction")]
    #[error("compaction store error: {0}")]
    Compaction(#[from] rocksdb::Error),

    /// The redb engine behind a page store failed.
    #[cfg(feature = "page")]
    #[error("page store error: {0}")]
    Page(#[from] redb::Error),

    /// A stored envelope could not be encoded or decoded.
    #[error("envelope encoding error: {0}")]
    Envelope(#[from] serde_json::Error),

    /// A stored record exists but its content is unusable.
    #[error("corrupt record for key {key:?}: {message}")]
    CorruptRecord {
        /// Key of the offending record.
        key: String,
        /// Description of the corruption.
        message: String,
    },

    /// The store has been shut down and its engine handle released.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Creates a corrupt record error.
    pub fn corrupt_record(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CorruptRecord {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Result type for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while turning configuration into a store.
///
/// These are fatal at startup: no store is constructed when one occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A duration string could not be parsed.
    #[error("unable to parse {field} as duration ({value:?}): {reason}")]
    InvalidDuration {
        /// Name of the configuration field.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// The compaction interval resolved to zero.
    #[error("compaction interval must be greater than zero")]
    ZeroInterval,

    /// The requested backend was compiled out of this build.
    #[error("storage backend {0:?} is not available in this build")]
    BackendUnavailable(&'static str),

    /// A configuration file could not be read.
    #[error("unable to read configuration: {0}")]
    Read(#[from] io::Error),

    /// A configuration file could not be parsed.
    #[error("unable to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an invalid duration error.
    pub fn invalid_duration(
        field: &'static str,
        value: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::InvalidDuration {
            field,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by [`crate::open_store`].
#[derive(Debug, Error)]
pub enum OpenError {
    /// The configuration was rejected before any engine was touched.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The selected engine failed to open.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_record_message() {
        let err = StoreError::corrupt_record("d1.s1", "bad base64");
        assert_eq!(err.to_string(), "corrupt record for key \"d1.s1\": bad base64");
    }

    #[test]
    fn invalid_duration_message() {
        let err = ConfigError::invalid_duration("ttl", "ten minutes", "unknown unit");
        assert!(err.to_string().contains("ttl"));
        assert!(err.to_string().contains("ten minutes"));
    }
}
