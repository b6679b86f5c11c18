//! Parsers for delimited sources and filter expressions.
//!
//! Each parser turns external text into the canonical data model: cell values
//! with inferred column types, or a checked expression tree.

pub mod delimited;
pub mod filter;

pub use delimited::{
    DelimitedOptions,
    DelimitedOutput,
    DelimitedParseError,
    DelimitedParser,
    parse_number,
    parse_temporal,
};
pub use filter::{
    BinaryOp,
    Expr,
    FilterErrorKind,
    FilterParseError,
    FilterParser,
    Method,
    UnaryOp,
};
