//! CLI command implementations.

pub mod batch;
pub mod get;
pub mod ingest;
pub mod set;
