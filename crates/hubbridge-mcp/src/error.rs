//! MCP error types.

use std::sync::Arc;
use thiserror::Error;

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;

/// JSON-RPC error code the MCP servers use for request timeouts.
pub const REQUEST_TIMEOUT_CODE: i64 = -32001;

/// Message fragment that marks a timeout in errors carried as text.
const TIMEOUT_MARKER: &str = "timed out";

/// Errors that can occur during MCP operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// Connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Establishing a session failed. Shared by every caller awaiting the
    /// same connect attempt.
    #[error("Connect failed: {0}")]
    ConnectFailed(#[source] Arc<McpError>),

    /// Protocol error.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// JSON-RPC error returned by the server.
    #[error("MCP error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Server initialization failed.
    #[error("Server initialization failed: {0}")]
    InitializationFailed(String),

    /// Authentication required.
    #[error("Authentication required")]
    AuthRequired,

    /// The client or transport was closed.
    #[error("Connection closed")]
    Closed,
}

impl McpError {
    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a protocol error.
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self::ProtocolError(message.into())
    }

    /// Whether the error is a timeout and the operation may be retried.
    ///
    /// Only timeouts qualify: the typed [`McpError::Timeout`], a JSON-RPC
    /// error carrying [`REQUEST_TIMEOUT_CODE`], or any error whose message
    /// says it timed out.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Rpc { code, .. } if *code == REQUEST_TIMEOUT_CODE => true,
            Self::ConnectFailed(inner) => inner.is_retryable(),
            Self::Http(e) if e.is_timeout() => true,
            other => other.to_string().to_lowercase().contains(TIMEOUT_MARKER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (
                McpError::ConnectionFailed("refused".to_string()),
                "Connection failed: refused",
            ),
            (
                McpError::ProtocolError("invalid".to_string()),
                "Protocol error: invalid",
            ),
            (
                McpError::Rpc {
                    code: -32601,
                    message: "Method not found".to_string(),
                },
                "MCP error -32601: Method not found",
            ),
            (McpError::Timeout, "Request timed out"),
            (
                McpError::InitializationFailed("init".to_string()),
                "Server initialization failed: init",
            ),
            (McpError::AuthRequired, "Authentication required"),
            (McpError::Closed, "Connection closed"),
        ];

        for (error, expected) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_connect_failed_wraps_inner() {
        let err = McpError::ConnectFailed(Arc::new(McpError::connection_failed("refused")));
        assert_eq!(err.to_string(), "Connect failed: Connection failed: refused");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_timeouts_are_retryable() {
        assert!(McpError::Timeout.is_retryable());
        assert!(McpError::Rpc {
            code: REQUEST_TIMEOUT_CODE,
            message: "slow".to_string(),
        }
        .is_retryable());
        assert!(McpError::protocol_error("upstream Timed Out after 30s").is_retryable());
        assert!(McpError::ConnectFailed(Arc::new(McpError::Timeout)).is_retryable());
    }

    #[test]
    fn test_other_errors_are_not_retryable() {
        assert!(!McpError::AuthRequired.is_retryable());
        assert!(!McpError::Closed.is_retryable());
        assert!(!McpError::connection_failed("refused").is_retryable());
        assert!(!McpError::Rpc {
            code: -32602,
            message: "Invalid params".to_string(),
        }
        .is_retryable());
        assert!(
            !McpError::ConnectFailed(Arc::new(McpError::connection_failed("refused")))
                .is_retryable()
        );
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let mcp_err: McpError = json_err.into();
        assert!(mcp_err.to_string().contains("JSON error"));
    }
}
