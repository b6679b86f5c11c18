use std::borrow::Cow;

use rmcp::ErrorData;
use rmcp::model::ErrorCode;
use serde_json::json;
use tabular_core::{QueryError, QueryErrorKind};

pub(crate) fn mcp_err(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: None,
    }
}

/// Converts a query failure into a structured tool error carrying
/// `{kind, message, query}`.
pub(crate) fn query_err(err: &QueryError, query: &str) -> ErrorData {
    let kind = err.kind();
    let code = match kind {
        QueryErrorKind::NotFound => ErrorCode::RESOURCE_NOT_FOUND,
        QueryErrorKind::Forbidden | QueryErrorKind::Malformed => ErrorCode::INVALID_PARAMS,
        QueryErrorKind::Unsupported => ErrorCode::INVALID_REQUEST,
    };
    let message = err.to_string();
    let data = json!({
        "kind": kind.as_str(),
        "message": message,
        "query": query,
    });
    ErrorData {
        data: Some(data),
        ..mcp_err(code, message)
    }
}
