use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use tabular_core::{FilterRequest, QueryError, QueryErrorKind, TableBackend};
use tracing::{debug, warn};

use crate::{TabularMcp, helpers};

/// Parameters for filtering rows of one table.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QueryTableParams {
    /// Table name as returned by `list_tables`.
    pub table: String,
    /// Row filter such as `amount > 100 and region == 'north'`. Omit to match every row.
    pub filter: Option<String>,
    /// Columns to return, in order. Omit for all columns.
    pub columns: Option<Vec<String>>,
}

/// Parameters for running a restricted statement.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExecuteQueryParams {
    /// A single read-only SELECT statement.
    pub query: String,
}

#[tool_router(router = tool_router_query, vis = "pub")]
impl<B: TableBackend> TabularMcp<B> {
    #[tool(description = "Filter rows of a table with an expression and optional column projection. Returns at most 10 rows, the total match count, and numeric summaries over all matches.")]
    async fn query_table(
        &self,
        Parameters(params): Parameters<QueryTableParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut request = FilterRequest::new(params.table);
        if let Some(filter) = params.filter {
            request = request.with_filter(filter);
        }
        if let Some(columns) = params.columns {
            request = request.with_columns(columns);
        }
        debug!("query_table {} filter={:?}", request.table, request.filter_text());
        let result = self.backend.query_table(&request).map_err(|err| {
            log_rejection(&err);
            helpers::query_err(&err, request.filter_text().unwrap_or(&request.table))
        })?;
        Ok(CallToolResult::success(vec![Content::json(result)?]))
    }

    #[tool(description = "Run one read-only SELECT statement over the loaded tables. Returns at most 10 rows. Writes, definitions and network functions are rejected.")]
    async fn execute_query(
        &self,
        Parameters(params): Parameters<ExecuteQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        debug!("execute_query {:?}", params.query);
        let result = self
            .backend
            .execute_statement(&params.query)
            .await
            .map_err(|err| {
                log_rejection(&err);
                helpers::query_err(&err, &params.query)
            })?;
        Ok(CallToolResult::success(vec![Content::json(result)?]))
    }
}

fn log_rejection(err: &QueryError) {
    if err.kind() == QueryErrorKind::Forbidden {
        warn!("rejected query: {err}");
    } else {
        debug!("query failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use rmcp::model::ErrorCode;
    use serde_json::Value as JsonValue;

    use super::*;
    use crate::test_support::{first_text, memory_server};

    fn params(filter: Option<&str>, columns: Option<&[&str]>) -> Parameters<QueryTableParams> {
        Parameters(QueryTableParams {
            table: "sales".to_string(),
            filter: filter.map(str::to_string),
            columns: columns.map(|names| names.iter().map(|name| (*name).to_string()).collect()),
        })
    }

    #[tokio::test]
    async fn query_table_caps_rows() {
        let server = memory_server();
        let result = server
            .query_table(params(Some("amount > 40"), Some(&["amount"])))
            .await
            .expect("query_table");
        let result: JsonValue = serde_json::from_str(&first_text(&result)).expect("result json");
        assert_eq!(result["returned_rows"], 10);
        assert_eq!(result["matched_rows"], 13);
        assert_eq!(result["truncated"], true);
        assert_eq!(result["rows"][0], serde_json::json!({"amount": 60}));
    }

    #[tokio::test]
    async fn rejected_filters_carry_kind_and_query() {
        let server = memory_server();
        let err = server
            .query_table(params(Some("@x > 1"), None))
            .await
            .expect_err("variable reference");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        let data = err.data.expect("payload");
        assert_eq!(data["kind"], "forbidden");
        assert_eq!(data["query"], "@x > 1");
    }

    #[tokio::test]
    async fn memory_backend_declines_statements() {
        let server = memory_server();
        let err = server
            .execute_query(Parameters(ExecuteQueryParams {
                query: "SELECT * FROM sales".to_string(),
            }))
            .await
            .expect_err("no statement engine");
        assert_eq!(err.data.expect("payload")["kind"], "unsupported");
    }
}
