//! Table models and schema constants for tabular-mcp.
//!
//! This crate defines the canonical data model shared by the loader, the
//! profiler, the query executor and the storage backends.

pub mod models;
pub mod schema;

pub use models::*;
