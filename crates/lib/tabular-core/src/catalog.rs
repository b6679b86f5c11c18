use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use tabular_store::models::{Table, TableProfile};

use crate::profile::profile_table;
use crate::query::QueryError;

#[derive(Debug)]
struct CatalogEntry {
    table: Arc<Table>,
    profile: OnceLock<TableProfile>,
}

/// Read-only mapping from table name to loaded table.
///
/// Names iterate in lexical order. Profiles are computed on first request
/// and kept for the life of the catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    #[must_use]
    pub fn new(tables: Vec<Table>) -> Self {
        let entries = tables
            .into_iter()
            .map(|table| {
                (
                    table.name.clone(),
                    CatalogEntry {
                        table: Arc::new(table),
                        profile: OnceLock::new(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn list_tables(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Looks up a table by exact name.
    ///
    /// # Errors
    /// Returns `QueryError::TableNotFound` if no table has that name.
    pub fn get_table(&self, name: &str) -> Result<&Arc<Table>, QueryError> {
        self.entry(name).map(|entry| &entry.table)
    }

    /// Returns the cached profile, computing it on first use.
    ///
    /// # Errors
    /// Returns `QueryError::TableNotFound` if no table has that name.
    pub fn profile(&self, name: &str) -> Result<&TableProfile, QueryError> {
        let entry = self.entry(name)?;
        Ok(entry.profile.get_or_init(|| profile_table(&entry.table)))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<Table>> {
        self.entries.values().map(|entry| &entry.table)
    }

    /// Drops a table, returning it if present.
    pub(crate) fn remove(&mut self, name: &str) -> Option<Arc<Table>> {
        self.entries.remove(name).map(|entry| entry.table)
    }

    fn entry(&self, name: &str) -> Result<&CatalogEntry, QueryError> {
        self.entries
            .get(name)
            .ok_or_else(|| QueryError::TableNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tabular_store::models::{Column, ColumnType, Value};

    use super::*;

    fn table(name: &str) -> Table {
        Table {
            name: name.to_string(),
            source: PathBuf::from(format!("{name}.csv")),
            columns: vec![Column {
                name: "n".to_string(),
                column_type: ColumnType::Numeric,
                values: vec![Value::Int(1), Value::Int(3)],
            }],
            row_count: 2,
        }
    }

    #[test]
    fn lists_names_in_lexical_order() {
        let catalog = Catalog::new(vec![table("zeta"), table("alpha"), table("Mid")]);
        assert_eq!(catalog.list_tables(), vec!["Mid", "alpha", "zeta"]);
        assert_eq!(catalog.list_tables(), catalog.list_tables());
    }

    #[test]
    fn unknown_tables_are_not_found() {
        let catalog = Catalog::new(vec![table("sales")]);
        assert_eq!(
            catalog.get_table("orders").map(|_| ()),
            Err(QueryError::TableNotFound("orders".to_string()))
        );
        assert!(catalog.profile("orders").is_err());
    }

    #[test]
    fn profiles_are_cached() {
        let catalog = Catalog::new(vec![table("sales")]);
        let first = catalog.profile("sales").expect("profile");
        let second = catalog.profile("sales").expect("profile");
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.columns[0].mean, Some(2.0));
    }
}
