//! Core types and services for tabular-mcp.
//!
//! This crate loads delimited files into an immutable catalog, profiles their
//! columns, evaluates read-only queries, and provides the `SurrealDB` backed
//! store used for statement queries.

pub mod backend;
pub mod catalog;
pub mod loader;
pub mod parsers;
pub mod profile;
pub mod query;
pub mod selection;
pub mod store;

pub use backend::{BackendKind, MemoryBackend, SurrealBackend, TableBackend};
pub use catalog::Catalog;
pub use loader::{LoadError, LoadOutput, Loader};
pub use query::{FilterRequest, QueryError, QueryErrorKind};
pub use selection::{Selection, SelectionError};
