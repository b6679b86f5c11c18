use std::future::Future;

use serde_json::Value as JsonValue;
use surrealdb::Connection;
use tabular_store::models::{LoadReport, QueryResult, Row, SkippedFile};
use tabular_store::schema::MAX_RESULT_ROWS;
use tracing::{info, warn};

use super::{BackendKind, TableBackend};
use crate::catalog::Catalog;
use crate::loader::LoadOutput;
use crate::query::{QueryError, ValidatedStatement, validate_statement};
use crate::store::{StoreError, SurrealTableStore};

/// Backend that mirrors every table into `SurrealDB` for statement queries.
pub struct SurrealBackend<C: Connection> {
    catalog: Catalog,
    report: LoadReport,
    store: SurrealTableStore<C>,
}

impl<C: Connection> SurrealBackend<C> {
    /// Writes the loaded tables to the store and builds the backend.
    ///
    /// Tables recorded by an earlier run that are no longer loaded are removed
    /// first. A table that fails to write is dropped from the catalog and
    /// reported as skipped.
    ///
    /// # Errors
    /// Returns `StoreError` if the bookkeeping table cannot be read or written,
    /// or if no table could be written.
    pub async fn load(store: SurrealTableStore<C>, output: LoadOutput) -> Result<Self, StoreError> {
        let LoadOutput { tables, mut report } = output;
        let mut catalog = Catalog::new(tables);
        let loaded = catalog.list_tables();

        for stale in store.previous_tables().await? {
            if !loaded.contains(&stale) {
                info!("removing stale table {stale}");
                store.remove_table(&stale).await?;
            }
        }

        let mut failed = Vec::new();
        for table in catalog.tables() {
            match store.write_table(table).await {
                Ok(rows) => info!("stored table {} ({rows} records)", table.name),
                Err(err) => {
                    warn!("failed to store table {}: {err}", table.name);
                    failed.push((table.name.clone(), err.to_string()));
                }
            }
        }

        for (name, reason) in failed {
            let file = catalog
                .remove(&name)
                .and_then(|table| {
                    table
                        .source
                        .file_name()
                        .and_then(|file| file.to_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| name.clone());
            // Drop any partial write.
            if let Err(err) = store.remove_table(&name).await {
                warn!("failed to remove partial table {name}: {err}");
            }
            report.loaded.retain(|loaded| loaded.table != name);
            report.skipped.push(SkippedFile {
                file,
                table: Some(name),
                reason,
            });
        }

        let stored = catalog.list_tables();
        store.record_tables(&stored).await?;
        if stored.is_empty() {
            return Err(StoreError::InvalidInput(
                "no table could be written to the store".to_string(),
            ));
        }
        Ok(Self {
            catalog,
            report,
            store,
        })
    }
}

impl<C: Connection> TableBackend for SurrealBackend<C> {
    fn kind(&self) -> BackendKind {
        BackendKind::Surreal
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
        let validated = validate_statement(statement, &self.catalog.list_tables());
        let store = self.store.clone();
        async move {
            let validated = validated?;
            let rows = store
                .select_rows(&validated.statement, MAX_RESULT_ROWS + 1)
                .await
                .map_err(|err| QueryError::Malformed(err.to_string()))?;
            let matched = if rows.len() > MAX_RESULT_ROWS {
                store
                    .count_rows(&validated.statement)
                    .await
                    .map_err(|err| QueryError::Malformed(err.to_string()))?
            } else {
                rows.len()
            };
            Ok(statement_result(validated, rows, matched))
        }
    }
}

/// Shapes engine output into a bounded result. Scalar rows are wrapped as
/// `{"value": ..}`; columns are listed in first-seen order.
fn statement_result(validated: ValidatedStatement, rows: Vec<JsonValue>, matched: usize) -> QueryResult {
    let truncated = rows.len() > MAX_RESULT_ROWS;
    let rows: Vec<Row> = rows
        .into_iter()
        .take(MAX_RESULT_ROWS)
        .map(|row| match row {
            JsonValue::Object(object) => object,
            other => {
                let mut object = Row::new();
                object.insert("value".to_string(), other);
                object
            }
        })
        .collect();

    let mut columns: Vec<String> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    QueryResult {
        query: validated.statement,
        tables: validated.tables,
        columns,
        returned_rows: rows.len(),
        rows,
        matched_rows: Some(matched),
        truncated,
        numeric_summary: Vec::new(),
    }
}
