//! Errors raised while dispatching MCP requests.

use crate::protocol::JsonRpcError;

pub type McpResult<T> = Result<T, McpError>;

#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    /// A handler failed; the message is passed to the client as-is
    #[error("{0:#}")]
    Handler(#[from] anyhow::Error),
}

impl From<McpError> for JsonRpcError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::MethodNotFound(method) => JsonRpcError::method_not_found(&method),
            McpError::InvalidParams(message) => JsonRpcError::invalid_params(message),
            // Unknown names surface as generic errors, the way handler failures do
            other => JsonRpcError::internal_error(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err: JsonRpcError = McpError::MethodNotFound("foo/bar".into()).into();
        assert_eq!(err.code, JsonRpcError::METHOD_NOT_FOUND);
        assert_eq!(err.message, "Method not found: foo/bar");

        let err: JsonRpcError = McpError::UnknownTool("nope".into()).into();
        assert_eq!(err.code, JsonRpcError::INTERNAL_ERROR);
        assert_eq!(err.message, "Unknown tool: nope");

        let err: JsonRpcError = McpError::InvalidParams("missing field `name`".into()).into();
        assert_eq!(err.code, JsonRpcError::INVALID_PARAMS);
    }

    #[test]
    fn test_handler_error_keeps_context_chain() {
        let inner = anyhow::anyhow!("connection refused").context("upstream call failed");
        let err: JsonRpcError = McpError::Handler(inner).into();
        assert_eq!(err.message, "upstream call failed: connection refused");
    }
}
