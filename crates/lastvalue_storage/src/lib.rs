//! # lastvalue storage
//!
//! Persistent last-value stores.
//!
//! A store keeps exactly one record per key: the most recent payload and
//! the time it was written. Keys are opaque strings; callers compose them
//! (the query layer uses `device.service`).
//!
//! ## Design Principles
//!
//! - Value and time are persisted together as one envelope per key
//! - A missing key is a normal [`Lookup::NotFound`], never an error
//! - Mutual exclusion is left to each engine's own transactions
//! - Background work stops when the shared [`ShutdownToken`] is cancelled
//!
//! ## Available Stores
//!
//! - [`CompactionStore`] - RocksDB, optional TTL, periodic compaction
//! - [`PageStore`] - redb single file, small footprint, no TTL
//! - [`InMemoryStore`] - For testing
//!
//! ## Example
//!
//! ```rust
//! use lastvalue_storage::{InMemoryStore, Lookup, Store};
//!
//! let store = InMemoryStore::new();
//! store.set("d1.s2", b"42").unwrap();
//!
//! let (value, time) = store.get("d1.s2").unwrap().into_wire();
//! assert_eq!(value, b"42");
//! assert!(time.is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "compaction")]
mod compaction;
mod config;
mod error;
mod factory;
mod lifecycle;
mod memory;
#[cfg(feature = "page")]
mod page;
mod record;
mod store;

#[cfg(feature = "compaction")]
pub use compaction::{CompactionOptions, CompactionStore};
pub use config::{StorageConfig, StorageSelection};
pub use error::{ConfigError, ConfigResult, OpenError, StoreError, StoreResult};
pub use factory::{open_store, resolve_backend};
pub use lifecycle::{ShutdownToken, TaskGroup};
pub use memory::InMemoryStore;
#[cfg(feature = "page")]
pub use page::{PageStore, TABLE_NAME};
pub use record::{Lookup, Record, NULL_MARKER};
pub use store::{BackendKind, Store};
