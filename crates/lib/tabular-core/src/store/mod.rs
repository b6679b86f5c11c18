//! Store interfaces and `SurrealDB` implementation.
//!
//! The store layer mirrors loaded tables into `SurrealDB`, tracks which tables
//! it wrote, and runs validated read-only statements.

pub mod surreal;

pub use surreal::{StoreError, StoreResult, SurrealTableStore, stored_field_names};
