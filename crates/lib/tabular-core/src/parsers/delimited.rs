use std::collections::HashSet;
use std::io::Read;
use std::{error::Error, fmt};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use tabular_store::models::{Column, ColumnType, Value};
use tabular_store::schema::{TYPE_THRESHOLD_PERCENT, is_null_token};

use crate::selection::ColumnSelection;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Options for parsing a delimited text file.
#[derive(Debug, Clone)]
pub struct DelimitedOptions {
    pub delimiter: u8,
    pub columns: Option<ColumnSelection>,
}

impl DelimitedOptions {
    #[must_use]
    pub const fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            columns: None,
        }
    }

    #[must_use]
    pub fn with_columns(mut self, columns: ColumnSelection) -> Self {
        self.columns = Some(columns);
        self
    }
}

/// Columns and row count parsed from a delimited file.
#[derive(Debug, Clone)]
pub struct DelimitedOutput {
    pub columns: Vec<Column>,
    pub row_count: usize,
}

#[derive(Debug)]
pub enum DelimitedParseError {
    Csv(csv::Error),
    MissingHeader,
}

impl fmt::Display for DelimitedParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(err) => write!(f, "malformed delimited data: {err}"),
            Self::MissingHeader => write!(f, "file has no header row"),
        }
    }
}

impl Error for DelimitedParseError {}

impl From<csv::Error> for DelimitedParseError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Parser for comma/tab separated files with a header row.
pub struct DelimitedParser;

impl DelimitedParser {
    /// Parses delimited text into typed columns.
    ///
    /// # Errors
    /// Returns `DelimitedParseError` if the header is missing, a record has the
    /// wrong number of fields, or the bytes are not valid UTF-8.
    pub fn parse<R: Read>(
        reader: R,
        options: &DelimitedOptions,
    ) -> Result<DelimitedOutput, DelimitedParseError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(DelimitedParseError::MissingHeader);
        }
        let names = normalize_headers(headers.iter());

        let kept: Vec<usize> = names
            .iter()
            .enumerate()
            .filter(|(_, name)| {
                options
                    .columns
                    .as_ref()
                    .is_none_or(|selection| selection.allows(name))
            })
            .map(|(index, _)| index)
            .collect();

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); kept.len()];
        let mut row_count = 0;
        for record in reader.records() {
            let record = record?;
            for (slot, &index) in kept.iter().enumerate() {
                raw[slot].push(record.get(index).unwrap_or_default().to_string());
            }
            row_count += 1;
        }

        let columns = kept
            .iter()
            .zip(raw)
            .map(|(&index, cells)| build_column(names[index].clone(), &cells))
            .collect();

        Ok(DelimitedOutput { columns, row_count })
    }
}

/// Trims names, fills blanks with `column_{n}` and suffixes duplicates.
fn normalize_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for (position, header) in headers.enumerate() {
        let trimmed = header.trim_start_matches('\u{feff}').trim();
        let base = if trimmed.is_empty() {
            format!("column_{}", position + 1)
        } else {
            trimmed.to_string()
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while !seen.insert(name.clone()) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        names.push(name);
    }
    names
}

/// Classification of one raw cell.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Bool(bool),
    Number(Value),
    Temporal(Value),
    Text,
}

fn classify(raw: &str) -> Cell {
    if is_null_token(raw) {
        return Cell::Null;
    }
    if let Some(value) = parse_bool(raw) {
        return Cell::Bool(value);
    }
    if let Some(value) = parse_number(raw) {
        return Cell::Number(value);
    }
    if let Some(value) = parse_temporal(raw) {
        return Cell::Temporal(value);
    }
    Cell::Text
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parses an integer, falling back to a finite float.
#[must_use]
pub fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(value) = raw.parse::<i64>() {
        return Some(Value::Int(value));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(Value::Float)
}

/// Parses the supported date and timestamp formats.
#[must_use]
pub fn parse_temporal(raw: &str) -> Option<Value> {
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(Value::DateTime(value.naive_utc()));
    }
    for format in DATETIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Value::DateTime(value));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(value) = NaiveDate::parse_from_str(raw, format) {
            return Some(Value::Date(value));
        }
    }
    None
}

#[derive(Debug, Default)]
struct CellCounts {
    non_null: usize,
    boolean: usize,
    numeric: usize,
    temporal: usize,
}

impl CellCounts {
    const fn meets_threshold(&self, count: usize) -> bool {
        count * 100 >= self.non_null * TYPE_THRESHOLD_PERCENT
    }

    const fn typed(&self) -> usize {
        self.boolean + self.numeric + self.temporal
    }
}

/// Applies the inference rules in order: unknown, boolean, numeric, temporal,
/// text, mixed.
fn infer_type(cells: &[Cell]) -> ColumnType {
    let mut counts = CellCounts::default();
    for cell in cells {
        match cell {
            Cell::Null => continue,
            Cell::Bool(_) => counts.boolean += 1,
            Cell::Number(_) => counts.numeric += 1,
            Cell::Temporal(_) => counts.temporal += 1,
            Cell::Text => {}
        }
        counts.non_null += 1;
    }

    if counts.non_null == 0 {
        ColumnType::Unknown
    } else if counts.boolean == counts.non_null {
        ColumnType::Boolean
    } else if counts.meets_threshold(counts.numeric) {
        ColumnType::Numeric
    } else if counts.meets_threshold(counts.temporal) {
        ColumnType::Temporal
    } else if counts.typed() * 100 <= counts.non_null * (100 - TYPE_THRESHOLD_PERCENT) {
        ColumnType::Text
    } else {
        ColumnType::Mixed
    }
}

fn build_column(name: String, raw: &[String]) -> Column {
    let cells: Vec<Cell> = raw.iter().map(|value| classify(value)).collect();
    let column_type = infer_type(&cells);
    let values = raw
        .iter()
        .zip(cells)
        .map(|(raw, cell)| cell_value(column_type, raw, cell))
        .collect();
    Column {
        name,
        column_type,
        values,
    }
}

fn cell_value(column_type: ColumnType, raw: &str, cell: Cell) -> Value {
    match (column_type, cell) {
        (_, Cell::Null) => Value::Null,
        (ColumnType::Text, _) => Value::Text(raw.to_string()),
        (ColumnType::Boolean | ColumnType::Mixed, Cell::Bool(value)) => Value::Bool(value),
        (ColumnType::Numeric | ColumnType::Mixed, Cell::Number(value))
        | (ColumnType::Temporal | ColumnType::Mixed, Cell::Temporal(value)) => value,
        _ => Value::Text(raw.to_string()),
    }
}
