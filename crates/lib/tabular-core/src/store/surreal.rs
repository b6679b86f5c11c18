use std::{error::Error, fmt, sync::Arc};

use serde_json::Value as JsonValue;
use surrealdb::{Connection, Surreal};
use tabular_store::models::{Row, Table};
use tabular_store::schema::{FIELD_RECORD_ID, FIELD_RECORD_ID_ALIAS, TABLE_CATALOG};

/// Rows sent per `INSERT` statement when mirroring a table.
const INSERT_BATCH_ROWS: usize = 1000;

#[derive(Debug)]
pub enum StoreError {
    Surreal(Box<surrealdb::Error>),
    InvalidInput(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surreal(err) => write!(f, "SurrealDB error: {err}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
        }
    }
}

impl Error for StoreError {}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        Self::Surreal(Box::new(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Mirrors loaded tables into `SurrealDB` and runs read-only selects.
///
/// Each table becomes a schemaless `SurrealDB` table whose record ids are the
/// 1-based row ordinals, so an unordered select returns rows in file order.
pub struct SurrealTableStore<C: Connection> {
    db: Arc<Surreal<C>>,
}

impl<C: Connection> Clone for SurrealTableStore<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealTableStore<C> {
    #[must_use]
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db: Arc::new(db),
        }
    }

    #[must_use]
    pub fn db(&self) -> &Surreal<C> {
        &self.db
    }

    /// Names recorded by the previous [`Self::record_tables`] call.
    ///
    /// # Errors
    /// Returns `StoreError` if the database query fails.
    pub async fn previous_tables(&self) -> StoreResult<Vec<String>> {
        let query = format!("SELECT VALUE name FROM {};", escape_ident(TABLE_CATALOG));
        let mut response = self.db.query(query).await?;
        let names: Vec<String> = response.take(0)?;
        Ok(names)
    }

    /// Removes a table and all of its records if it exists.
    ///
    /// # Errors
    /// Returns `StoreError` if the name is empty or the database call fails.
    pub async fn remove_table(&self, name: &str) -> StoreResult<()> {
        ensure_non_empty(name, "table name")?;
        let query = format!("REMOVE TABLE IF EXISTS {};", escape_ident(name));
        self.db.query(query).await?.check()?;
        Ok(())
    }

    /// Replaces the stored copy of `table` with its current rows.
    ///
    /// Returns the number of records written.
    ///
    /// # Errors
    /// Returns `StoreError` if the name is empty or any database call fails.
    pub async fn write_table(&self, table: &Table) -> StoreResult<usize> {
        ensure_non_empty(&table.name, "table name")?;
        let ident = escape_ident(&table.name);
        let define = format!("REMOVE TABLE IF EXISTS {ident}; DEFINE TABLE {ident} SCHEMALESS;");
        self.db.query(define).await?.check()?;

        let fields = stored_field_names(&table.column_names());
        let insert = format!("INSERT INTO {ident} $rows RETURN NONE;");
        let mut written = 0;
        let mut start = 0;
        while start < table.row_count {
            let end = (start + INSERT_BATCH_ROWS).min(table.row_count);
            let rows: Vec<JsonValue> = (start..end)
                .map(|row| record(table, &fields, row))
                .collect::<StoreResult<_>>()?;
            self.db
                .query(insert.as_str())
                .bind(("rows", rows))
                .await?
                .check()?;
            written += end - start;
            start = end;
        }
        Ok(written)
    }

    /// Rewrites the bookkeeping table with the names that are now stored.
    ///
    /// # Errors
    /// Returns `StoreError` if the database call fails.
    pub async fn record_tables(&self, names: &[String]) -> StoreResult<()> {
        let ident = escape_ident(TABLE_CATALOG);
        let reset = format!("REMOVE TABLE IF EXISTS {ident}; DEFINE TABLE {ident} SCHEMALESS;");
        self.db.query(reset).await?.check()?;
        if names.is_empty() {
            return Ok(());
        }
        let rows: Vec<JsonValue> = names
            .iter()
            .map(|name| serde_json::json!({ "name": name }))
            .collect();
        self.db
            .query(format!("INSERT INTO {ident} $rows RETURN NONE;"))
            .bind(("rows", rows))
            .await?
            .check()?;
        Ok(())
    }

    /// Runs an already validated `SELECT`, materialising at most `limit` rows.
    ///
    /// The statement is wrapped as a subquery so the engine enforces the limit
    /// and record ids are stripped from the output. It sits on its own lines so
    /// a trailing line comment cannot swallow the wrapper.
    ///
    /// # Errors
    /// Returns `StoreError` if the limit is out of range or the engine rejects
    /// the statement.
    pub async fn select_rows(&self, statement: &str, limit: usize) -> StoreResult<Vec<JsonValue>> {
        let limit = limit_to_i64(limit)?;
        let query = format!(
            "SELECT * OMIT {FIELD_RECORD_ID} FROM (\n{statement}\n) LIMIT {limit};"
        );
        let mut response = self.db.query(query).await?;
        let rows: Vec<JsonValue> = response.take(0)?;
        Ok(rows)
    }

    /// Counts the rows an already validated `SELECT` produces without
    /// returning them.
    ///
    /// # Errors
    /// Returns `StoreError` if the engine rejects the statement.
    pub async fn count_rows(&self, statement: &str) -> StoreResult<usize> {
        let query = format!("SELECT count() AS total FROM (\n{statement}\n) GROUP ALL;");
        let mut response = self.db.query(query).await?;
        let rows: Vec<JsonValue> = response.take(0)?;
        // GROUP ALL over nothing yields no row at all.
        let Some(row) = rows.first() else {
            return Ok(0);
        };
        row.get("total")
            .and_then(JsonValue::as_u64)
            .and_then(|total| usize::try_from(total).ok())
            .ok_or_else(|| StoreError::InvalidInput(format!("unexpected count result: {row}")))
    }
}

/// Field names used in the store, with the record id name moved aside.
#[must_use]
pub fn stored_field_names(columns: &[String]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::with_capacity(columns.len());
    for column in columns {
        let mut field = if column == FIELD_RECORD_ID {
            FIELD_RECORD_ID_ALIAS.to_string()
        } else {
            column.clone()
        };
        while fields.contains(&field)
            || columns.iter().any(|other| other == &field && other != column)
        {
            field.push('_');
        }
        fields.push(field);
    }
    fields
}

fn record(table: &Table, fields: &[String], row: usize) -> StoreResult<JsonValue> {
    let ordinal = i64::try_from(row + 1)
        .map_err(|_| StoreError::InvalidInput("row ordinal exceeds supported range".to_string()))?;
    let mut object = Row::new();
    object.insert(FIELD_RECORD_ID.to_string(), JsonValue::from(ordinal));
    for (column, field) in table.columns.iter().zip(fields) {
        let value = column.values.get(row).map_or(JsonValue::Null, |value| value.to_json());
        object.insert(field.clone(), value);
    }
    Ok(JsonValue::Object(object))
}

/// Quotes an identifier with backticks.
fn escape_ident(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len() + 2);
    escaped.push('`');
    for ch in name.chars() {
        if ch == '`' || ch == '\\' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('`');
    escaped
}

fn ensure_non_empty(value: &str, field: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}

fn limit_to_i64(limit: usize) -> StoreResult<i64> {
    i64::try_from(limit).map_err(|_| {
        StoreError::InvalidInput("limit exceeds supported range".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_column_is_moved_aside() {
        let columns = vec!["id".to_string(), "name".to_string()];
        assert_eq!(stored_field_names(&columns), vec!["id_", "name"]);
    }

    #[test]
    fn alias_never_collides_with_a_real_column() {
        let columns = vec!["id".to_string(), "id_".to_string()];
        assert_eq!(stored_field_names(&columns), vec!["id__", "id_"]);
    }

    #[test]
    fn identifiers_are_backtick_quoted() {
        assert_eq!(escape_ident("sales"), "`sales`");
        assert_eq!(escape_ident("odd`name"), "`odd\\`name`");
    }
}
