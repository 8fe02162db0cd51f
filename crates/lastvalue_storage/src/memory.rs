//! In-memory store for testing.

use crate::error::StoreResult;
use crate::record::{Lookup, Record};
use crate::store::{BackendKind, Store};
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory store.
///
/// Records live in a map guarded by a read/write lock, which gives the same
/// whole-record replacement the engine-backed stores get from their
/// transactions. Suitable for:
/// - Unit tests
/// - Ephemeral caches that don't need persistence
///
/// # Example
///
/// ```rust
/// use lastvalue_storage::{InMemoryStore, Lookup, Store};
///
/// let store = InMemoryStore::new();
/// store.set("d1.s1", b"42").unwrap();
/// assert!(matches!(store.get("d1.s1").unwrap(), Lookup::Found(_)));
/// assert_eq!(store.get("d1.s2").unwrap(), Lookup::NotFound);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, Record>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with records.
    ///
    /// Useful for testing readers against fixed timestamps.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = (String, Record)>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Returns the number of keys held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no key has been set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Removes every record.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl Store for InMemoryStore {
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let record = Record::now(value);
        self.records.write().insert(key.to_string(), record);
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Lookup> {
        Ok(self
            .records
            .read()
            .get(key)
            .cloned()
            .map_or(Lookup::NotFound, Lookup::Found))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }
}
