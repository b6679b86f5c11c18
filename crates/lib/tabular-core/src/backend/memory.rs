use std::future::{Future, ready};

use tabular_store::models::{LoadReport, QueryResult};

use super::{BackendKind, TableBackend};
use crate::catalog::Catalog;
use crate::loader::LoadOutput;
use crate::query::{QueryError, validate_statement};

/// Backend that serves everything from the in-process catalog.
#[derive(Debug)]
pub struct MemoryBackend {
    catalog: Catalog,
    report: LoadReport,
}

impl MemoryBackend {
    #[must_use]
    pub fn new(output: LoadOutput) -> Self {
        Self {
            catalog: Catalog::new(output.tables),
            report: output.report,
        }
    }
}

impl TableBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn load_report(&self) -> &LoadReport {
        &self.report
    }

    fn execute_statement(
        &self,
        statement: &str,
    ) -> impl Future<Output = Result<QueryResult, QueryError>> + Send {
        let result = validate_statement(statement, &self.catalog.list_tables()).and_then(|_| {
            Err(QueryError::Unsupported(
                "statement queries need the surreal backend; use query_table with a filter instead"
                    .to_string(),
            ))
        });
        ready(result)
    }
}
