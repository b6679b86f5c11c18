use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use tabular_core::TableBackend;

use crate::{TabularMcp, helpers};

/// Parameters for describing one table.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DescribeTableParams {
    /// Table name as returned by `list_tables`.
    pub table: String,
}

#[tool_router(router = tool_router_catalog, vis = "pub")]
impl<B: TableBackend> TabularMcp<B> {
    #[tool(description = "List loaded table names in lexical order.")]
    async fn list_tables(&self) -> Result<CallToolResult, ErrorData> {
        let tables = self.backend.list_tables();
        Ok(CallToolResult::success(vec![Content::json(tables)?]))
    }

    #[tool(description = "Describe a table: row count, column count, and per-column type, null counts, distinct counts, min/max/mean or top values.")]
    async fn describe_table(
        &self,
        Parameters(params): Parameters<DescribeTableParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let profile = self
            .backend
            .describe(&params.table)
            .map_err(|err| helpers::query_err(&err, &params.table))?;
        Ok(CallToolResult::success(vec![Content::json(profile)?]))
    }

    #[tool(description = "Report which files were loaded, skipped (with reasons), or excluded at startup.")]
    async fn load_report(&self) -> Result<CallToolResult, ErrorData> {
        let report = self.backend.load_report();
        Ok(CallToolResult::success(vec![Content::json(report)?]))
    }
}
