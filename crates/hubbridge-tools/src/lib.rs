//! Host tools for hubbridge.
//!
//! This crate exposes a remote tool hub as three local tools (`hub_search`,
//! `hub_describe`, `hub_call`). The [`HubBridge`] façade resolves the hub
//! endpoint from host configuration and environment, keeps one session open
//! and retries timed out requests.

pub mod args;
pub mod bridge;
pub mod config;
pub mod error;
pub mod format;
pub mod hub;
pub mod mutation;
pub mod registry;
pub mod retry;

pub use bridge::{CallRequest, DescribeRequest, HubBridge, HubBridgeBuilder, SearchRequest};
pub use config::{ConnectorConfig, EnvSource, HostConfig, ProcessEnv};
pub use error::{ConfigError, ToolError, ToolResult};
pub use mutation::{MutationClassifier, VerbHeuristic};
pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context provided to tools during execution.
pub struct ToolContext {
    /// Session ID.
    pub session_id: String,
    /// Cancellation token.
    pub abort: CancellationToken,
}

impl ToolContext {
    /// Create a context with a fresh cancellation token.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            abort: CancellationToken::new(),
        }
    }
}

/// Result of tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Title/summary of the operation.
    pub title: String,
    /// Output text.
    pub output: String,
    /// Tool-specific metadata.
    pub metadata: Value,
}

impl ToolOutput {
    /// Create a new tool output.
    pub fn new(title: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            output: output.into(),
            metadata: Value::Null,
        }
    }

    /// Add metadata to the output.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The main trait for tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool ID.
    fn id(&self) -> &str;

    /// Get the tool description (for the AI).
    fn description(&self) -> &str;

    /// Get the JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<ToolOutput>;
}

/// A boxed tool for dynamic dispatch.
pub type BoxedTool = Arc<dyn Tool>;
