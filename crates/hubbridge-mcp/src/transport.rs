//! MCP transport implementations.

use crate::endpoint::Endpoint;
use crate::error::McpResult;
use crate::http::{HttpConfig, StreamableHttpTransport};
use crate::negotiate::TransportMode;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::sse::{SseConfig, SseTransport};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the underlying channel, if the transport needs one before the
    /// first request.
    async fn start(&self) -> McpResult<()> {
        Ok(())
    }

    /// Send a request and wait for a response.
    async fn request(&self, request: JsonRpcRequest) -> McpResult<JsonRpcResponse>;

    /// Send a notification (no response expected).
    async fn notify(&self, notification: JsonRpcNotification) -> McpResult<()>;

    /// Close the transport.
    async fn close(&self) -> McpResult<()>;

    /// Check if the transport is connected.
    fn is_connected(&self) -> bool;

    /// Whether the transport has been started and has since lost its channel.
    ///
    /// Request/response transports never die between requests.
    fn is_dead(&self) -> bool {
        false
    }
}

/// Builds transports for an endpoint.
pub trait TransportFactory: Send + Sync {
    /// Create an unstarted transport for `endpoint` using `mode`.
    fn create(&self, mode: TransportMode, endpoint: &Endpoint) -> McpResult<Arc<dyn Transport>>;
}

/// Factory for the two HTTP based transports.
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    timeout: Duration,
}

impl HttpTransportFactory {
    /// Create a factory whose transports use `timeout` per request.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpTransportFactory {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl TransportFactory for HttpTransportFactory {
    fn create(&self, mode: TransportMode, endpoint: &Endpoint) -> McpResult<Arc<dyn Transport>> {
        let transport: Arc<dyn Transport> = match mode {
            TransportMode::StreamableHttp => Arc::new(StreamableHttpTransport::new(HttpConfig {
                url: endpoint.url.clone(),
                headers: endpoint.headers.clone(),
                timeout: self.timeout,
            })?),
            TransportMode::Sse => Arc::new(SseTransport::new(SseConfig {
                url: endpoint.url.clone(),
                headers: endpoint.headers.clone(),
                timeout: self.timeout,
            })?),
        };
        Ok(transport)
    }
}
