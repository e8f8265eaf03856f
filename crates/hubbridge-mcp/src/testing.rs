//! In-memory MCP server for tests.
//!
//! [`MockHub`] is a [`TransportFactory`] whose transports answer the
//! initialize handshake and route `tools/call` requests to a handler closure.
//! It counts what happens so tests can assert on session behaviour without
//! a network.

use crate::endpoint::Endpoint;
use crate::error::{McpError, McpResult};
use crate::negotiate::TransportMode;
use crate::protocol::{
    CallToolParams, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    ToolCallResult, PROTOCOL_VERSION,
};
use crate::transport::{Transport, TransportFactory};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = dyn Fn(&str, &Value) -> McpResult<ToolCallResult> + Send + Sync;

/// A `tools/call` request seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub name: String,
    pub arguments: Value,
}

#[derive(Default)]
struct HubState {
    created: AtomicUsize,
    connects: AtomicUsize,
    closes: AtomicUsize,
    failing_connects: AtomicUsize,
    fail_closes: AtomicBool,
    connect_delay: Mutex<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    endpoints: Mutex<Vec<(TransportMode, Endpoint)>>,
    transports: Mutex<Vec<Arc<MockTransport>>>,
}

/// Scripted MCP server.
#[derive(Clone)]
pub struct MockHub {
    handler: Arc<Handler>,
    state: Arc<HubState>,
}

impl MockHub {
    /// Create a hub answering every tool call with `handler`.
    pub fn new(
        handler: impl Fn(&str, &Value) -> McpResult<ToolCallResult> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Arc::new(handler),
            state: Arc::new(HubState::default()),
        }
    }

    /// A hub that answers with the call's arguments serialized as text.
    pub fn echo() -> Self {
        Self::new(|_, arguments| Ok(ToolCallResult::text(arguments.to_string())))
    }

    /// Make the next `count` handshakes fail with a connection error.
    pub fn fail_next_connects(&self, count: usize) {
        self.state.failing_connects.store(count, Ordering::SeqCst);
    }

    /// Make every transport close fail.
    pub fn fail_closes(&self) {
        self.state.fail_closes.store(true, Ordering::SeqCst);
    }

    /// Delay each handshake by `delay`.
    pub fn set_connect_delay(&self, delay: Duration) {
        *lock(&self.state.connect_delay) = delay;
    }

    /// Mark every transport created so far as having lost its channel.
    pub fn kill_transports(&self) {
        for transport in lock(&self.state.transports).iter() {
            transport.dead.store(true, Ordering::SeqCst);
        }
    }

    /// Number of transports created.
    pub fn created(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }

    /// Number of initialize handshakes attempted.
    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Number of transport closes.
    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Every tool call received, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.state.calls).clone()
    }

    /// Number of calls received for `name`.
    pub fn calls_to(&self, name: &str) -> usize {
        lock(&self.state.calls)
            .iter()
            .filter(|call| call.name == name)
            .count()
    }

    /// Mode and endpoint of every transport created, in order.
    pub fn endpoints(&self) -> Vec<(TransportMode, Endpoint)> {
        lock(&self.state.endpoints).clone()
    }
}

impl TransportFactory for MockHub {
    fn create(&self, mode: TransportMode, endpoint: &Endpoint) -> McpResult<Arc<dyn Transport>> {
        self.state.created.fetch_add(1, Ordering::SeqCst);
        lock(&self.state.endpoints).push((mode, endpoint.clone()));

        let transport = Arc::new(MockTransport {
            handler: self.handler.clone(),
            state: self.state.clone(),
            connected: AtomicBool::new(false),
            dead: AtomicBool::new(false),
        });
        lock(&self.state.transports).push(transport.clone());
        Ok(transport)
    }
}

struct MockTransport {
    handler: Arc<Handler>,
    state: Arc<HubState>,
    connected: AtomicBool,
    dead: AtomicBool,
}

impl MockTransport {
    async fn initialize(&self, id: u64) -> McpResult<JsonRpcResponse> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);

        let delay = *lock(&self.state.connect_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failing = self.state.failing_connects.load(Ordering::SeqCst);
        if failing > 0 {
            self.state
                .failing_connects
                .store(failing - 1, Ordering::SeqCst);
            return Err(McpError::connection_failed("mock hub refused connection"));
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "mock-hub", "version": "0.0.0"}
            }),
        ))
    }

    fn call(&self, id: u64, params: Option<Value>) -> McpResult<JsonRpcResponse> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(McpError::Closed);
        }

        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))?;
        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        lock(&self.state.calls).push(RecordedCall {
            name: params.name.clone(),
            arguments: arguments.clone(),
        });

        match (self.handler)(&params.name, &arguments) {
            Ok(result) => Ok(success(id, serde_json::to_value(result)?)),
            Err(McpError::Rpc { code, message }) => Ok(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id,
                result: None,
                error: Some(JsonRpcError {
                    code,
                    message,
                    data: None,
                }),
            }),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, request: JsonRpcRequest) -> McpResult<JsonRpcResponse> {
        let id = request.id.unwrap_or_default();
        match request.method.as_str() {
            "initialize" => self.initialize(id).await,
            "tools/call" => self.call(id, request.params),
            other => Ok(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {other}"),
                    data: None,
                }),
            }),
        }
    }

    async fn notify(&self, _notification: JsonRpcNotification) -> McpResult<()> {
        Ok(())
    }

    async fn close(&self) -> McpResult<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        if self.state.fail_closes.load(Ordering::SeqCst) {
            return Err(McpError::protocol_error("mock hub failed to close"));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.dead.load(Ordering::SeqCst)
    }

    fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }
}

fn success(id: u64, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: Some(result),
        error: None,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
