//! Store trait definition.

use crate::error::StoreResult;
use crate::record::Lookup;
use std::fmt;

/// Identifies the engine behind a [`Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// RocksDB log-structured merge store with TTL and background compaction.
    Compaction,
    /// redb single-file B+tree store.
    Page,
    /// Process-local map, used for tests.
    Memory,
}

impl BackendKind {
    /// Short name used in logs and configuration.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Compaction => "badger",
            Self::Page => "bolt",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A durable map from key to the last value written under it.
///
/// Keys are opaque strings; stores never parse them.
///
/// # Invariants
///
/// - At most one record exists per key; `set` replaces value and time together
/// - A concurrent reader never observes a partially written record
/// - `get` on a key that was never set (or has expired) returns
///   [`Lookup::NotFound`], not an error
/// - Implementations are `Send + Sync` and share one instance across threads
///
/// # Implementors
///
/// - [`crate::CompactionStore`] - RocksDB, optional TTL
/// - [`crate::PageStore`] - redb, no TTL
/// - [`crate::InMemoryStore`] - for tests
pub trait Store: Send + Sync {
    /// Stores `value` under `key`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine write fails or the store is closed.
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Reads the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine read fails, the stored envelope is
    /// unreadable, or the store is closed.
    fn get(&self, key: &str) -> StoreResult<Lookup>;

    /// Returns which engine backs this store.
    fn kind(&self) -> BackendKind;
}

impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &str) -> StoreResult<Lookup> {
        (**self).get(key)
    }

    fn kind(&self) -> BackendKind {
        (**self).kind()
    }
}
