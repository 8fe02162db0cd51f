//! # lastvalue testkit
//!
//! Test utilities for the lastvalue cache.
//!
//! This crate provides:
//! - Temporary stores and services for every backend selection
//! - Property-based test generators using proptest
//! - Concurrency stress runs checking value/time pairing
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lastvalue_storage::{StorageSelection, Store};
//! use lastvalue_testkit::prelude::*;
//!
//! let fixture = temp_store(StorageSelection::Bolt);
//! fixture.store().set("d1.s2", b"42").unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
