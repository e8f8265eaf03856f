//! Tool error types.

use hubbridge_mcp::McpError;
use thiserror::Error;

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Invalid parameters.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration or input rejected before any network activity.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The hub could not be reached or answered with a protocol error.
    #[error("Hub request failed: {0}")]
    Mcp(#[from] McpError),

    /// Operation was cancelled.
    #[error("Cancelled")]
    Cancelled,

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Configuration errors. Each one names the setting that fixes it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No URL from the environment or the host configuration.
    #[error("no hub URL configured: set HUBBRIDGE_URL or mcp.{connector}.url")]
    MissingUrl { connector: String },

    /// No Authorization header from the environment or the host configuration.
    #[error(
        "no Authorization header configured: set HUBBRIDGE_AUTHORIZATION \
         (or HUBBRIDGE_AUTH_HEADER, HUBBRIDGE_TOKEN) or mcp.{connector}.headers.Authorization"
    )]
    MissingAuthorization { connector: String },

    /// The Authorization header is present but blank.
    #[error(
        "Authorization header is empty: set HUBBRIDGE_AUTHORIZATION \
         (or HUBBRIDGE_AUTH_HEADER, HUBBRIDGE_TOKEN) or mcp.{connector}.headers.Authorization"
    )]
    EmptyAuthorization { connector: String },

    /// Tool call arguments are not a JSON object.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Invalid JSON/JSONC syntax.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// Environment variable not found during substitution.
    #[error("environment variable not found: {name}")]
    EnvVarNotFound { name: String },

    /// Explicitly requested config file does not exist.
    #[error("config file not found: {path}")]
    NotFound { path: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
