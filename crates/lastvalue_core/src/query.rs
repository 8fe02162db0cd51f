//! Point lookups of `(device, service, path)`.

use crate::error::CoreResult;
use crate::flatten::PathFlattener;
use chrono::{DateTime, Utc};
use lastvalue_storage::{Lookup, Store};
use serde_json::Value;
use std::sync::Arc;

/// Composes the store key for a device/service pair.
#[must_use]
pub fn record_key(device_key: &str, service_key: &str) -> String {
    format!("{device_key}.{service_key}")
}

/// Result of one lookup.
///
/// `value` is `Null` both for a key that was never written and for a path
/// the record does not contain; `time` is `None` only in the first case.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Value at the requested path.
    pub value: Value,
    /// Write time of the record, `None` if the key has no record.
    pub time: Option<DateTime<Utc>>,
}

impl QueryResult {
    /// The result for a key with no record.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            value: Value::Null,
            time: None,
        }
    }
}

/// Anything that can answer a last-value lookup.
pub trait LastValueSource: Send + Sync {
    /// Resolves the value at `path` in the last record of `device.service`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn last_value(&self, device_key: &str, service_key: &str, path: &str)
        -> CoreResult<QueryResult>;
}

/// Resolves lookups against a shared [`Store`].
///
/// Every call re-reads and re-flattens the record; there is no caching
/// layer above the store.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn Store>,
    flattener: PathFlattener,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("backend", &self.store.kind())
            .field("flattener", &self.flattener)
            .finish()
    }
}

impl QueryEngine {
    /// Creates an engine over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_flattener(store, PathFlattener::new())
    }

    /// Creates an engine with a configured flattener.
    #[must_use]
    pub fn with_flattener(store: Arc<dyn Store>, flattener: PathFlattener) -> Self {
        Self { store, flattener }
    }

    /// Returns the store this engine reads from.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Resolves `path` in the last value of `device_key.service_key`.
    ///
    /// # Errors
    ///
    /// Store errors are returned unchanged; missing keys and paths are not
    /// errors.
    pub fn get(&self, device_key: &str, service_key: &str, path: &str) -> CoreResult<QueryResult> {
        let key = record_key(device_key, service_key);
        let record = match self.store.get(&key)? {
            Lookup::Found(record) => record,
            Lookup::NotFound => return Ok(QueryResult::missing()),
        };

        let value = self.flattener.lookup(&record.value, path);
        Ok(QueryResult {
            value,
            time: Some(record.time),
        })
    }
}

impl LastValueSource for QueryEngine {
    fn last_value(
        &self,
        device_key: &str,
        service_key: &str,
        path: &str,
    ) -> CoreResult<QueryResult> {
        self.get(device_key, service_key, path)
    }
}
