//! Startup loading of delimited files into tables.
//!
//! Per-file problems are recorded in the [`LoadReport`] and skipped; only an
//! unreadable directory or an empty result stops the load.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::{error::Error, fmt};

use tabular_store::models::{LoadReport, LoadedTable, SkippedFile, Table};
use tabular_store::schema::{TABLE_CATALOG, delimiter_for_extension};
use tracing::{info, warn};

use crate::parsers::{DelimitedOptions, DelimitedParseError, DelimitedParser};
use crate::selection::Selection;

#[derive(Debug)]
pub enum LoadError {
    SourceDirectory { path: PathBuf, source: io::Error },
    NoTables { path: PathBuf, skipped: usize },
    DuplicateTable { table: String, first: PathBuf },
    ReservedTable { table: String },
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: DelimitedParseError },
    Empty { path: PathBuf },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceDirectory { path, source } => {
                write!(f, "cannot read data directory {}: {source}", path.display())
            }
            Self::NoTables { path, skipped } => write!(
                f,
                "no tables loaded from {} ({skipped} file(s) skipped)",
                path.display()
            ),
            Self::DuplicateTable { table, first } => write!(
                f,
                "table `{table}` is already provided by {}",
                first.display()
            ),
            Self::ReservedTable { table } => write!(f, "table name `{table}` is reserved"),
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Parse { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Empty { path } => write!(f, "{} has no header row", path.display()),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SourceDirectory { source, .. } | Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Tables read from disk plus the report describing what was skipped.
#[derive(Debug, Clone)]
pub struct LoadOutput {
    pub tables: Vec<Table>,
    pub report: LoadReport,
}

/// A recognised source file.
#[derive(Debug)]
struct Candidate {
    file_name: String,
    path: PathBuf,
    table: String,
    delimiter: u8,
}

/// Loads every `*.csv`/`*.tsv` file in one directory.
#[derive(Debug, Clone)]
pub struct Loader {
    dir: PathBuf,
    selection: Selection,
}

impl Loader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            selection: Selection::default(),
        }
    }

    #[must_use]
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Scans the directory and parses every recognised file.
    ///
    /// # Errors
    /// Returns `LoadError::SourceDirectory` if the directory cannot be listed
    /// and `LoadError::NoTables` if no file produced a table.
    pub fn load(&self) -> Result<LoadOutput, LoadError> {
        let candidates = self.scan()?;
        let mut report = LoadReport::default();
        let mut tables = Vec::new();
        let mut claimed: BTreeMap<String, PathBuf> = BTreeMap::new();

        for candidate in candidates {
            if !self.selection.allows_table(&candidate.table) {
                info!("table {} excluded by selection", candidate.table);
                if !report.excluded_tables.contains(&candidate.table) {
                    report.excluded_tables.push(candidate.table);
                }
                continue;
            }

            let outcome = if candidate.table == TABLE_CATALOG {
                Err(LoadError::ReservedTable {
                    table: candidate.table.clone(),
                })
            } else if let Some(first) = claimed.get(&candidate.table) {
                Err(LoadError::DuplicateTable {
                    table: candidate.table.clone(),
                    first: first.clone(),
                })
            } else {
                claimed.insert(candidate.table.clone(), candidate.path.clone());
                self.load_file(&candidate)
            };

            match outcome {
                Ok(table) => {
                    info!(
                        "loaded table {} ({} rows, {} columns) from {}",
                        table.name,
                        table.row_count,
                        table.columns.len(),
                        candidate.file_name
                    );
                    report.loaded.push(LoadedTable {
                        table: table.name.clone(),
                        file: candidate.file_name,
                        row_count: table.row_count,
                        column_count: table.columns.len(),
                    });
                    tables.push(table);
                }
                Err(err) => {
                    warn!("skipping {}: {err}", candidate.file_name);
                    report.skipped.push(SkippedFile {
                        file: candidate.file_name,
                        table: Some(candidate.table),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if tables.is_empty() {
            return Err(LoadError::NoTables {
                path: self.dir.clone(),
                skipped: report.skipped.len(),
            });
        }
        Ok(LoadOutput { tables, report })
    }

    /// Lists recognised files in lexical order of file name.
    fn scan(&self) -> Result<Vec<Candidate>, LoadError> {
        let source_error = |source| LoadError::SourceDirectory {
            path: self.dir.clone(),
            source,
        };
        let entries = std::fs::read_dir(&self.dir).map_err(source_error)?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(source_error)?;
            let path = entry.path();
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("ignoring non UTF-8 file name {}", path.display());
                continue;
            };
            if file_name.starts_with('.') || !path.is_file() {
                continue;
            }
            let Some(delimiter) = path
                .extension()
                .and_then(|extension| extension.to_str())
                .and_then(delimiter_for_extension)
            else {
                continue;
            };
            let Some(table) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            candidates.push(Candidate {
                table: table.to_string(),
                file_name,
                path,
                delimiter,
            });
        }
        candidates.sort_by(|left, right| left.file_name.cmp(&right.file_name));
        Ok(candidates)
    }

    fn load_file(&self, candidate: &Candidate) -> Result<Table, LoadError> {
        let file = File::open(&candidate.path).map_err(|source| LoadError::Io {
            path: candidate.path.clone(),
            source,
        })?;
        let mut options = DelimitedOptions::new(candidate.delimiter);
        if let Some(columns) = self.selection.columns_for(&candidate.table) {
            options = options.with_columns(columns.clone());
        }
        let output = DelimitedParser::parse(BufReader::new(file), &options).map_err(|err| {
            match err {
                DelimitedParseError::MissingHeader => LoadError::Empty {
                    path: candidate.path.clone(),
                },
                source => LoadError::Parse {
                    path: candidate.path.clone(),
                    source,
                },
            }
        })?;
        Ok(Table {
            name: candidate.table.clone(),
            source: candidate.path.clone(),
            columns: output.columns,
            row_count: output.row_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

    /// Fresh scratch directory under the system temp dir.
    fn scratch(files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "tabular-loader-{}-{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create scratch dir");
        for (name, contents) in files {
            std::fs::write(dir.join(name), contents).expect("write fixture");
        }
        dir
    }

    #[test]
    fn loads_csv_and_tsv_in_lexical_order() {
        let dir = scratch(&[
            ("b.tsv", "x\ty\n1\t2\n"),
            ("a.CSV", "x,y\n1,2\n3,4\n"),
            ("notes.txt", "ignored"),
            (".hidden.csv", "x\n1\n"),
        ]);
        let output = Loader::new(&dir).load().expect("load should succeed");
        let names: Vec<&str> = output.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(output.tables[0].row_count, 2);
        assert!(output.report.skipped.is_empty());
    }

    #[test]
    fn first_file_wins_a_duplicate_name() {
        let dir = scratch(&[("dup.csv", "x\n1\n"), ("dup.tsv", "x\n2\n")]);
        let output = Loader::new(&dir).load().expect("load should succeed");
        assert_eq!(output.tables.len(), 1);
        assert_eq!(output.tables[0].source.file_name().and_then(|n| n.to_str()), Some("dup.csv"));
        assert_eq!(output.report.skipped.len(), 1);
        assert_eq!(output.report.skipped[0].file, "dup.tsv");
    }

    #[test]
    fn bad_files_are_skipped_not_fatal() {
        let dir = scratch(&[
            ("good.csv", "x\n1\n"),
            ("ragged.csv", "a,b\n1,2\n3\n"),
            ("empty.csv", ""),
            ("_tabular_catalog.csv", "name\nx\n"),
        ]);
        let output = Loader::new(&dir).load().expect("load should succeed");
        assert_eq!(output.tables.len(), 1);
        let skipped: Vec<&str> = output
            .report
            .skipped
            .iter()
            .map(|file| file.file.as_str())
            .collect();
        assert_eq!(skipped, vec!["_tabular_catalog.csv", "empty.csv", "ragged.csv"]);
    }

    #[test]
    fn header_only_file_is_an_empty_table() {
        let dir = scratch(&[("shape.csv", "a,b\n")]);
        let output = Loader::new(&dir).load().expect("load should succeed");
        assert_eq!(output.tables[0].row_count, 0);
        assert_eq!(output.tables[0].columns.len(), 2);
    }

    #[test]
    fn nothing_loadable_is_fatal() {
        let dir = scratch(&[("empty.csv", "")]);
        assert!(matches!(
            Loader::new(&dir).load(),
            Err(LoadError::NoTables { skipped: 1, .. })
        ));
        assert!(matches!(
            Loader::new(dir.join("missing")).load(),
            Err(LoadError::SourceDirectory { .. })
        ));
    }

    #[test]
    fn selection_excludes_tables_and_columns() {
        let dir = scratch(&[
            ("keep.csv", "name,secret\na,b\n"),
            ("raw_dump.csv", "x\n1\n"),
        ]);
        let selection = Selection::parse(
            "exclude_tables = [\"raw_dump\"]\n[columns.keep]\nexclude = [\"secret\"]\n",
        )
        .expect("selection should parse");
        let output = Loader::new(&dir)
            .with_selection(selection)
            .load()
            .expect("load should succeed");
        assert_eq!(output.tables.len(), 1);
        assert_eq!(output.tables[0].column_names(), vec!["name".to_string()]);
        assert_eq!(output.report.excluded_tables, vec!["raw_dump".to_string()]);
    }
}
