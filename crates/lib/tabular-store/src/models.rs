use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;

/// One result row: column name to JSON value, in column order.
pub type Row = serde_json::Map<String, JsonValue>;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// Always finite.
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    #[must_use]
    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::Date(_) | Self::DateTime(_))
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Temporal cells as a timestamp; dates are taken at midnight.
    #[must_use]
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(date) => date.and_hms_opt(0, 0, 0),
            Self::DateTime(value) => Some(*value),
            _ => None,
        }
    }

    /// Short type tag used in distinct keys and error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
        }
    }

    /// Key identifying a value by type and canonical text.
    #[must_use]
    pub fn distinct_key(&self) -> String {
        format!("{}:{self}", self.type_name())
    }

    /// Ordering between values of compatible kinds; `None` across kinds.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(left), Self::Int(right)) => Some(left.cmp(right)),
            (left, right) if left.is_numeric() && right.is_numeric() => {
                left.as_f64()?.partial_cmp(&right.as_f64()?)
            }
            (left, right) if left.is_temporal() && right.is_temporal() => {
                Some(left.as_datetime()?.cmp(&right.as_datetime()?))
            }
            (Self::Text(left), Self::Text(right)) => Some(left.cmp(right)),
            (Self::Bool(left), Self::Bool(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(value) => JsonValue::Bool(*value),
            Self::Int(value) => JsonValue::from(*value),
            Self::Float(value) => serde_json::Number::from_f64(*value)
                .map_or(JsonValue::Null, JsonValue::Number),
            Self::Text(value) => JsonValue::String(value.clone()),
            Self::Date(_) | Self::DateTime(_) => JsonValue::String(self.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{}", value.format(DATE_FORMAT)),
            Self::DateTime(value) => write!(f, "{}", value.format(DATETIME_FORMAT)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Text(value) => serializer.serialize_str(value),
            Self::Date(_) | Self::DateTime(_) => serializer.collect_str(self),
        }
    }
}

/// Inferred value type of a column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Text,
    Temporal,
    Boolean,
    Mixed,
    Unknown,
}

impl ColumnType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Temporal => "temporal",
            Self::Boolean => "boolean",
            Self::Mixed => "mixed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed column holding one value per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub values: Vec<Value>,
}

/// A table loaded from one source file. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub source: PathBuf,
    pub columns: Vec<Column>,
    pub row_count: usize,
}

impl Table {
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    /// Builds a result row for `row` restricted to the given column indexes.
    #[must_use]
    pub fn row(&self, row: usize, columns: &[usize]) -> Row {
        let mut record = Row::new();
        for &index in columns {
            let column = &self.columns[index];
            let value = column.values.get(row).map_or(JsonValue::Null, Value::to_json);
            record.insert(column.name.clone(), value);
        }
        record
    }
}

/// A frequent value with its occurrence count.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopValue {
    pub value: Value,
    pub count: usize,
}

/// Per-column type and summary statistics.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub count: usize,
    pub null_count: usize,
    pub non_null_count: usize,
    pub distinct_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_values: Vec<TopValue>,
}

/// Shape and column descriptors of a table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableProfile {
    pub table: String,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnDescriptor>,
}

/// Summary of a numeric column over every row a filter matched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Sample standard deviation; absent below two values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
}

/// Bounded output of a read-only query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub query: String,
    pub tables: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub returned_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rows: Option<usize>,
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub numeric_summary: Vec<NumericSummary>,
}

/// A table that made it into the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadedTable {
    pub table: String,
    pub file: String,
    pub row_count: usize,
    pub column_count: usize,
}

/// A source file that was skipped during load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedFile {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub reason: String,
}

/// Outcome of a startup load.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<LoadedTable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_tables: Vec<String>,
}
