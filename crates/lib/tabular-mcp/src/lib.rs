//! MCP server implementation for tabular-mcp.
//!
//! This crate wires a table backend into rmcp tool handlers and exposes the
//! MCP-facing API surface for table discovery and read-only queries.

mod helpers;
mod tools;
pub mod server;

use std::sync::Arc;

use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use tabular_core::TableBackend;

pub use tools::catalog::DescribeTableParams;
pub use tools::query::{ExecuteQueryParams, QueryTableParams};

const SERVER_INSTRUCTIONS: &str = r"tabular-mcp provides read-only MCP tools for exploring a fixed set of CSV/TSV tables.

Workflow:
1. Call `list_tables` to see which tables are loaded (names are file names without extension).
2. Call `describe_table` with a `table` to get its row count and per-column type and statistics.
3. Query rows:
   - `query_table` takes a `table`, an optional `filter` expression (e.g. `amount > 100 and region == 'north'`)
     and optional `columns` to project.
   - `execute_query` takes a single read-only SELECT statement (persistent backend only).
4. Every query returns at most 10 rows, plus `truncated` when more rows matched.

Notes:
- `load_report` lists files that were skipped at startup and why.
- Use `help` and `query_help` for the filter and statement syntax.
- `health` returns `ok`.";

/// MCP server wrapper around a table backend and tool routers.
pub struct TabularMcp<B: TableBackend> {
    tool_router: ToolRouter<Self>,
    backend: Arc<B>,
}

impl<B: TableBackend> Clone for TabularMcp<B> {
    fn clone(&self) -> Self {
        Self {
            tool_router: self.tool_router.clone(),
            backend: self.backend.clone(),
        }
    }
}

impl<B: TableBackend> TabularMcp<B> {
    /// Creates a new server owning the backend.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_backend(Arc::new(backend))
    }

    /// Creates a new server using a shared backend handle.
    #[must_use]
    pub fn with_backend(backend: Arc<B>) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_catalog()
            + Self::tool_router_query()
            + Self::tool_router_context();
        Self {
            tool_router,
            backend,
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl<B: TableBackend> TabularMcp<B> {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }
}

#[tool_handler]
impl<B: TableBackend> ServerHandler for TabularMcp<B> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use tabular_core::loader::LoadOutput;
    use tabular_core::MemoryBackend;
    use tabular_store::models::{Column, ColumnType, LoadReport, LoadedTable, Table, Value};

    use crate::TabularMcp;

    /// Server over a single fifteen row `sales` table.
    pub(crate) fn memory_server() -> TabularMcp<MemoryBackend> {
        let amounts = (1..=15).map(|n| Value::Int(n * 20)).collect();
        let regions = (1..=15)
            .map(|n| Value::Text(if n % 2 == 0 { "north" } else { "south" }.to_string()))
            .collect();
        let table = Table {
            name: "sales".to_string(),
            source: PathBuf::from("sales.csv"),
            columns: vec![
                Column {
                    name: "region".to_string(),
                    column_type: ColumnType::Text,
                    values: regions,
                },
                Column {
                    name: "amount".to_string(),
                    column_type: ColumnType::Numeric,
                    values: amounts,
                },
            ],
            row_count: 15,
        };
        let report = LoadReport {
            loaded: vec![LoadedTable {
                table: "sales".to_string(),
                file: "sales.csv".to_string(),
                row_count: 15,
                column_count: 2,
            }],
            ..LoadReport::default()
        };
        TabularMcp::new(MemoryBackend::new(LoadOutput {
            tables: vec![table],
            report,
        }))
    }

    /// Text payload of the first content item.
    pub(crate) fn first_text(result: &rmcp::model::CallToolResult) -> String {
        result
            .content
            .first()
            .and_then(|content| content.as_text())
            .map(|text| text.text.clone())
            .unwrap_or_default()
    }
}
