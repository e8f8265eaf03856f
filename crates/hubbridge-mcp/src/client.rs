//! MCP client implementation.

use crate::error::{McpError, McpResult};
use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, ToolCallResult,
};
use crate::transport::Transport;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// A client speaking MCP to one server over one transport.
///
/// The client does not own the transport's lifetime: whoever created both
/// closes both.
pub struct McpClient {
    transport: Arc<dyn Transport>,
    /// Request ID counter.
    next_id: AtomicU64,
    closed: AtomicBool,
    /// Result of the initialize handshake.
    server: OnceLock<InitializeResult>,
}

impl McpClient {
    /// Create a client over `transport`. Call [`McpClient::connect`] before use.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            server: OnceLock::new(),
        }
    }

    /// Get the next request ID.
    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Open the transport and run the initialize handshake.
    pub async fn connect(&self) -> McpResult<()> {
        self.transport.start().await?;

        let init_params = InitializeParams::default();
        let request = JsonRpcRequest::new(
            self.next_request_id(),
            "initialize",
            Some(serde_json::to_value(&init_params)?),
        );

        let response = self.transport.request(request).await?;

        if let Some(error) = response.error {
            return Err(McpError::InitializationFailed(error.message));
        }

        let init_result: InitializeResult = serde_json::from_value(
            response
                .result
                .ok_or_else(|| McpError::protocol_error("Missing initialize result"))?,
        )
        .map_err(|e| McpError::protocol_error(e.to_string()))?;

        debug!(
            protocol_version = %init_result.protocol_version,
            server_name = %init_result.server_info.name,
            "MCP server initialized"
        );

        let notification = JsonRpcNotification::new("notifications/initialized", None);
        self.transport.notify(notification).await?;

        let _ = self.server.set(init_result);
        Ok(())
    }

    /// Server details from the initialize handshake.
    pub fn server_info(&self) -> Option<&InitializeResult> {
        self.server.get()
    }

    /// Call a tool on the server.
    ///
    /// A result flagged `isError` is returned as a value, not as an error.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolCallResult> {
        if self.is_closed() {
            return Err(McpError::Closed);
        }

        debug!(tool = name, "Calling MCP tool");

        let params = CallToolParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };

        let request = JsonRpcRequest::new(
            self.next_request_id(),
            "tools/call",
            Some(serde_json::to_value(&params)?),
        );

        let response = self.transport.request(request).await?;
        let result = into_result(response, "tools/call")?;

        serde_json::from_value(result).map_err(|e| McpError::protocol_error(e.to_string()))
    }

    /// Mark the client closed. Later calls fail with [`McpError::Closed`].
    pub async fn close(&self) -> McpResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for McpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpClient")
            .field("server", &self.server_info().map(|init| &init.server_info.name))
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Extract the result of a response, turning JSON-RPC errors into [`McpError::Rpc`].
fn into_result(response: JsonRpcResponse, method: &str) -> McpResult<Value> {
    if let Some(error) = response.error {
        return Err(McpError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    response
        .result
        .ok_or_else(|| McpError::protocol_error(format!("Missing {method} result")))
}
