//! Allow/deny configuration for tables and columns.
//!
//! The file is read once at startup and handed to the loader as an immutable
//! snapshot. A missing file means every table and column is included.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{error::Error, fmt, io};

use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum SelectionError {
    Read { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, message: String },
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read selection file {}: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "invalid selection file {}: {message}", path.display())
            }
        }
    }
}

impl Error for SelectionError {}

/// Column allow/deny lists for one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnSelection {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ColumnSelection {
    /// Deny wins over allow; an empty allow list admits everything.
    #[must_use]
    pub fn allows(&self, column: &str) -> bool {
        if self.exclude.iter().any(|name| name == column) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|name| name == column)
    }
}

/// Table and column selection applied while loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Selection {
    pub include_tables: Vec<String>,
    pub exclude_tables: Vec<String>,
    pub columns: BTreeMap<String, ColumnSelection>,
}

impl Selection {
    /// Reads the selection file, returning the permissive default when it does
    /// not exist.
    ///
    /// # Errors
    /// Returns `SelectionError` if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SelectionError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map_err(|message| SelectionError::Parse {
                path: path.to_path_buf(),
                message,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(SelectionError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parses selection TOML.
    ///
    /// # Errors
    /// Returns the TOML error message when the text is not a valid selection.
    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|err| err.to_string())
    }

    #[must_use]
    pub fn allows_table(&self, table: &str) -> bool {
        if self.exclude_tables.iter().any(|name| name == table) {
            return false;
        }
        self.include_tables.is_empty() || self.include_tables.iter().any(|name| name == table)
    }

    #[must_use]
    pub fn columns_for(&self, table: &str) -> Option<&ColumnSelection> {
        self.columns.get(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
include_tables = []
exclude_tables = ["raw_dump"]

[columns.sales]
exclude = ["customer_email"]

[columns.people]
include = ["name", "age"]
exclude = ["age"]
"#;

    #[test]
    fn parses_table_and_column_lists() {
        let selection = Selection::parse(SAMPLE).expect("selection should parse");
        assert!(!selection.allows_table("raw_dump"));
        assert!(selection.allows_table("sales"));

        let sales = selection.columns_for("sales").expect("sales columns");
        assert!(!sales.allows("customer_email"));
        assert!(sales.allows("amount"));
    }

    #[test]
    fn deny_wins_over_allow() {
        let selection = Selection::parse(SAMPLE).expect("selection should parse");
        let people = selection.columns_for("people").expect("people columns");
        assert!(people.allows("name"));
        assert!(!people.allows("age"));
        assert!(!people.allows("email"));
    }

    #[test]
    fn include_list_restricts_tables() {
        let selection = Selection {
            include_tables: vec!["sales".to_string()],
            ..Selection::default()
        };
        assert!(selection.allows_table("sales"));
        assert!(!selection.allows_table("people"));
    }

    #[test]
    fn missing_file_includes_everything() {
        let selection = Selection::load(Path::new("definitely/not/here/tables.toml"))
            .expect("missing file is not an error");
        assert_eq!(selection, Selection::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Selection::parse("exclude = [\"x\"]").is_err());
    }
}
