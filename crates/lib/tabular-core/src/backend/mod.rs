//! Table backends behind one interface.
//!
//! Both backends answer filter requests from the in-process catalog. They
//! differ in statement support: the persistent backend runs validated selects
//! on `SurrealDB`, the in-memory backend validates and then declines.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tabular_store::models::{LoadReport, QueryResult, TableProfile};

use crate::catalog::Catalog;
use crate::query::{FilterRequest, QueryError, run_filter};

pub mod memory;
pub mod surreal;

pub use memory::MemoryBackend;
pub use surreal::SurrealBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Memory,
    Surreal,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Surreal => "surreal",
        }
    }

    /// Whether restricted statements can be executed.
    #[must_use]
    pub const fn supports_statements(self) -> bool {
        matches!(self, Self::Surreal)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only access to loaded tables.
pub trait TableBackend: Send + Sync + 'static {
    fn kind(&self) -> BackendKind;

    fn catalog(&self) -> &Catalog;

    fn load_report(&self) -> &LoadReport;

    /// Table names in lexical order.
    fn list_tables(&self) -> Vec<String> {
        self.catalog().list_tables()
    }

    /// Profile of one table.
    ///
    /// # Errors
    /// Returns `QueryError::TableNotFound` for unknown tables.
    fn describe(&self, table: &str) -> Result<TableProfile, QueryError> {
        self.catalog().profile(table).cloned()
    }

    /// Evaluates a row filter against one table.
    ///
    /// # Errors
    /// Returns `QueryError` for unknown tables or columns and for rejected
    /// filter expressions.
    fn query_table(&self, request: &FilterRequest) -> Result<QueryResult, QueryError> {
        let table = self.catalog().get_table(&request.table)?;
        run_filter(table, request)
    }

    /// Validates and runs a restricted statement.
    fn execute_statement(
        &self,
        statement: &str,
    ) -> impl Future<Output = Result<QueryResult, QueryError>> + Send;
}
