//! Read-only query execution over loaded tables.
//!
//! Two request surfaces share one error taxonomy: row filters evaluated by
//! [`filter`] and restricted statements validated by [`guard`] before they
//! reach an engine.

use std::{error::Error, fmt};

use serde::{Deserialize, Serialize};

use crate::parsers::{FilterErrorKind, FilterParseError};

pub mod filter;
pub mod guard;

pub use filter::run_filter;
pub use guard::{ValidatedStatement, validate_statement};

/// Coarse error category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryErrorKind {
    NotFound,
    Forbidden,
    Malformed,
    Unsupported,
}

impl QueryErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Malformed => "malformed",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    TableNotFound(String),
    ColumnNotFound { table: String, column: String },
    Forbidden(String),
    Malformed(String),
    Unsupported(String),
}

impl QueryError {
    #[must_use]
    pub const fn kind(&self) -> QueryErrorKind {
        match self {
            Self::TableNotFound(_) | Self::ColumnNotFound { .. } => QueryErrorKind::NotFound,
            Self::Forbidden(_) => QueryErrorKind::Forbidden,
            Self::Malformed(_) => QueryErrorKind::Malformed,
            Self::Unsupported(_) => QueryErrorKind::Unsupported,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableNotFound(table) => write!(f, "unknown table: {table}"),
            Self::ColumnNotFound { table, column } => {
                write!(f, "unknown column `{column}` in table {table}")
            }
            Self::Forbidden(message) => write!(f, "forbidden: {message}"),
            Self::Malformed(message) => write!(f, "malformed query: {message}"),
            Self::Unsupported(message) => write!(f, "unsupported: {message}"),
        }
    }
}

impl Error for QueryError {}

impl From<FilterParseError> for QueryError {
    fn from(err: FilterParseError) -> Self {
        match err.kind {
            FilterErrorKind::Forbidden => Self::Forbidden(err.message),
            FilterErrorKind::Malformed => Self::Malformed(err.message),
        }
    }
}

/// Row filter over one table with an optional projection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterRequest {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

impl FilterRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// The filter text with surrounding whitespace removed, if any remains.
    #[must_use]
    pub fn filter_text(&self) -> Option<&str> {
        self.filter
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}
