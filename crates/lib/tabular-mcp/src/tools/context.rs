use rmcp::{
    ErrorData,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use tabular_core::TableBackend;
use tabular_store::schema::MAX_RESULT_ROWS;

use crate::TabularMcp;

/// Payload listing the MCP commands and the active backend.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HelpCommands {
    pub backend: String,
    pub statements_supported: bool,
    pub commands: Vec<String>,
}

impl HelpCommands {
    fn for_backend<B: TableBackend>(backend: &B) -> Self {
        let kind = backend.kind();
        Self {
            backend: kind.to_string(),
            statements_supported: kind.supports_statements(),
            commands: vec![
                "help - List MCP commands and the active backend.".to_string(),
                "query_help - Syntax of filter expressions and read-only statements.".to_string(),
                "list_tables - List loaded table names.".to_string(),
                "describe_table - Row count and per-column types and statistics for a table."
                    .to_string(),
                "query_table - Filter rows of one table with an expression and optional columns."
                    .to_string(),
                "execute_query - Run one read-only SELECT statement.".to_string(),
                "load_report - Files loaded, skipped or excluded at startup.".to_string(),
                "health - Returns ok.".to_string(),
            ],
        }
    }
}

const FILTER_HELP: &str = r#"Filter expressions (query_table `filter`):
- Columns: bare names (`amount`) or backticks for other names (`unit price`).
- Literals: 42, 3.5, 'text' or "text", true/false, null.
- Comparison: == != < <= > >= (one per operand pair; combine with `and`).
- Membership: region in ['north', 'south'], region not in ['east'].
- Boolean: and / &, or / |, not / ~. Parentheses group (at most 64 levels deep).
- Arithmetic: + - * / %. Division by zero yields null.
- Methods: name.str.contains('x'), .str.startswith('x'), .str.endswith('x'), .isna(), .notna().
- Dates compare with date strings: date >= '2024-01-01'.
- Not allowed: @variables, assignment, `;`, function calls, other attributes, __dunder__ names."#;

#[tool_router(router = tool_router_context, vis = "pub")]
impl<B: TableBackend> TabularMcp<B> {
    #[tool(description = "List the MCP commands and which backend is active.")]
    async fn help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::json(
            HelpCommands::for_backend(self.backend()),
        )?]))
    }

    #[tool(description = "Explains filter expression syntax and the rules for read-only statements.")]
    async fn query_help(&self) -> Result<CallToolResult, ErrorData> {
        let statements = if self.backend().kind().supports_statements() {
            r"Statements (execute_query `query`):
- A single SurrealQL SELECT, e.g. SELECT region, math::sum(amount) AS total FROM sales GROUP BY region.
- Table names are the names from list_tables; a source column named `id` is available as `id_`.
- Writes, definitions, LET/INFO/USE, transactions, http:: and fn:: functions and extra statements are rejected."
        } else {
            "Statements (execute_query): not available with the memory backend; use query_table."
        };
        Ok(CallToolResult::success(vec![Content::text(format!(
            "{FILTER_HELP}\n\n{statements}\n\nResults hold at most {MAX_RESULT_ROWS} rows; `truncated` is true when more matched."
        ))]))
    }
}
