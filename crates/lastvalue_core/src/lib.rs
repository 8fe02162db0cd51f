//! # lastvalue core
//!
//! Query engine and ingestion for the lastvalue cache.
//!
//! The cache keeps the most recent message per `(device, service)` pair
//! and answers lookups that drill into any sub-field of that message:
//!
//! - [`PathFlattener`] maps a payload to `path -> sub-value`
//! - [`QueryEngine`] composes a store read with flattening
//! - [`Ingestor`] writes bus messages into the store
//! - [`LastValues`] resolves request batches in order
//! - [`LastValueService`] owns the store and its shutdown
//!
//! ## Example
//!
//! ```rust
//! use lastvalue_core::QueryEngine;
//! use lastvalue_storage::{InMemoryStore, Store};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new());
//! store.set("d1.s7", br#"{"foo": "bar", "batz": 42}"#).unwrap();
//!
//! let engine = QueryEngine::new(store);
//! assert_eq!(engine.get("d1", "s7", "batz").unwrap().value, json!(42));
//! assert_eq!(engine.get("d1", "s7", "bar").unwrap().value, json!(null));
//! assert!(engine.get("d2", "s7", "").unwrap().time.is_none());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod api;
mod config;
mod error;
mod flatten;
mod ingest;
mod query;
mod service;

pub use api::{BatchError, LastValueRequest, LastValueResponse, LastValues};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use flatten::{flatten_value, FlatValues, PathFlattener, PATH_SEPARATOR};
pub use ingest::{CommandResponse, Ingestor, Topic, TopicKind, EVENT_FILTER, RESPONSE_FILTER};
pub use query::{record_key, LastValueSource, QueryEngine, QueryResult};
pub use service::LastValueService;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
