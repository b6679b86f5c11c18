//! MCP tool modules.
//!
//! Tools are grouped by domain: catalog discovery, row queries, and
//! contextual help for the query languages.

pub mod catalog;
pub mod query;
mod context;
