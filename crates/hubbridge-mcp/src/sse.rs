//! SSE (Server-Sent Events) transport for remote MCP servers.
//!
//! This implements the legacy HTTP+SSE transport for MCP:
//! - HTTP GET opens a long-lived event stream
//! - the first `endpoint` event names the URL that accepts POSTed messages
//! - responses arrive as `message` events and are routed to waiting requests by id

use crate::error::{McpError, McpResult};
use crate::http::{check_status, map_send_error};
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::{Transport, DEFAULT_REQUEST_TIMEOUT};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use reqwest_eventsource::{Event, EventSource};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

/// Name of the event announcing the message endpoint.
const ENDPOINT_EVENT: &str = "endpoint";

type PendingRequests = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// SSE transport configuration.
#[derive(Debug, Clone)]
pub struct SseConfig {
    /// The event stream URL (e.g., `https://mcp.example.com/sse`)
    pub url: String,
    /// Headers sent on the stream and on every POST.
    pub headers: BTreeMap<String, String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            headers: BTreeMap::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// SSE transport for remote MCP servers.
pub struct SseTransport {
    config: SseConfig,
    client: Client,
    connected: Arc<AtomicBool>,
    /// Set once the event stream has ended after being opened.
    dead: Arc<AtomicBool>,
    /// URL announced by the `endpoint` event
    message_url: RwLock<Option<String>>,
    pending: PendingRequests,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SseTransport {
    /// Create a new SSE transport. The stream is opened by [`Transport::start`].
    pub fn new(config: SseConfig) -> McpResult<Self> {
        // The stream is long-lived, so only connecting is bounded here.
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| {
                McpError::connection_failed(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            client,
            connected: Arc::new(AtomicBool::new(false)),
            dead: Arc::new(AtomicBool::new(false)),
            message_url: RwLock::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
            listener: Mutex::new(None),
        })
    }

    /// The URL messages are POSTed to, once announced.
    pub async fn message_url(&self) -> Option<String> {
        self.message_url.read().await.clone()
    }

    fn with_headers(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (name, value) in &self.config.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        req
    }

    async fn post(&self, body: String) -> McpResult<()> {
        let url = self.message_url().await.ok_or(McpError::Closed)?;
        let response = self
            .with_headers(self.client.post(&url))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_send_error)?;
        check_status(response).await?;
        Ok(())
    }

    /// Resolve the announced endpoint against the stream URL.
    fn resolve_endpoint(&self, announced: &str) -> McpResult<String> {
        let base = Url::parse(&self.config.url)
            .map_err(|e| McpError::connection_failed(format!("Invalid SSE URL: {e}")))?;
        base.join(announced)
            .map(String::from)
            .map_err(|e| McpError::protocol_error(format!("Invalid endpoint event: {e}")))
    }
}

/// Read the event stream until it ends, routing responses by id.
async fn listen(
    mut events: EventSource,
    endpoint_tx: oneshot::Sender<McpResult<String>>,
    pending: PendingRequests,
    connected: Arc<AtomicBool>,
    dead: Arc<AtomicBool>,
) {
    let mut endpoint_tx = Some(endpoint_tx);

    while let Some(event) = events.next().await {
        match event {
            Ok(Event::Open) => debug!("SSE stream opened"),
            Ok(Event::Message(message)) if message.event == ENDPOINT_EVENT => {
                if let Some(tx) = endpoint_tx.take() {
                    let _ = tx.send(Ok(message.data.trim().to_string()));
                }
            }
            Ok(Event::Message(message)) => {
                if !deliver(&pending, &message.data).await {
                    debug!(event = %message.event, "Ignoring SSE message that is not a pending reply");
                }
            }
            Err(e) => {
                let err = map_event_error(e);
                match endpoint_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(Err(err));
                    }
                    None => warn!(error = %err, "SSE stream ended"),
                }
                break;
            }
        }
    }

    events.close();
    connected.store(false, Ordering::SeqCst);
    dead.store(true, Ordering::SeqCst);
    // Dropping the senders fails every request still waiting.
    pending.lock().await.clear();
}

/// Hand a reply frame to the request waiting on its id.
async fn deliver(pending: &PendingRequests, data: &str) -> bool {
    let Some(response) = JsonRpcResponse::parse_reply(data) else {
        return false;
    };
    match pending.lock().await.remove(&response.id) {
        Some(sender) => sender.send(response).is_ok(),
        None => false,
    }
}

fn map_event_error(error: reqwest_eventsource::Error) -> McpError {
    use reqwest_eventsource::Error;

    match error {
        Error::InvalidStatusCode(status, _) if status == StatusCode::UNAUTHORIZED => {
            McpError::AuthRequired
        }
        Error::InvalidStatusCode(status, _) => {
            McpError::protocol_error(format!("Event stream returned {status}"))
        }
        Error::Transport(e) => map_send_error(e),
        Error::StreamEnded => McpError::Closed,
        other => McpError::connection_failed(format!("Event stream failed: {other}")),
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn start(&self) -> McpResult<()> {
        let req = self
            .with_headers(self.client.get(&self.config.url))
            .header("Accept", "text/event-stream");
        let mut events = EventSource::new(req)
            .map_err(|e| McpError::connection_failed(format!("Cannot open event stream: {e}")))?;
        // Reconnecting would open a new server session behind our back.
        events.set_retry_policy(Box::new(reqwest_eventsource::retry::Never));

        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let handle = tokio::spawn(listen(
            events,
            endpoint_tx,
            self.pending.clone(),
            self.connected.clone(),
            self.dead.clone(),
        ));
        *self.listener.lock().await = Some(handle);

        let announced = tokio::time::timeout(self.config.timeout, endpoint_rx)
            .await
            .map_err(|_| McpError::Timeout)?
            .map_err(|_| {
                McpError::connection_failed("Event stream closed before announcing an endpoint")
            })??;

        let message_url = self.resolve_endpoint(&announced)?;
        debug!(url = %message_url, "SSE endpoint announced");
        *self.message_url.write().await = Some(message_url);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn request(&self, request: JsonRpcRequest) -> McpResult<JsonRpcResponse> {
        if !self.is_connected() {
            return Err(McpError::Closed);
        }
        let id = request
            .id
            .ok_or_else(|| McpError::protocol_error("Request without id"))?;
        let request_json = serde_json::to_string(&request)?;

        debug!(id, method = %request.method, "Sending SSE request");

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let outcome = tokio::time::timeout(self.config.timeout, async {
            self.post(request_json).await?;
            rx.await.map_err(|_| McpError::Closed)
        })
        .await;

        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                self.pending.lock().await.remove(&id);
                Err(e)
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(McpError::Timeout)
            }
        }
    }

    async fn notify(&self, notification: JsonRpcNotification) -> McpResult<()> {
        let notification_json = serde_json::to_string(&notification)?;

        debug!(method = %notification.method, "Sending SSE notification");

        self.post(notification_json).await
    }

    async fn close(&self) -> McpResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(handle) = self.listener.lock().await.take() {
            handle.abort();
        }
        self.pending.lock().await.clear();
        *self.message_url.write().await = None;
        debug!("Closed SSE transport");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.dead.load(Ordering::SeqCst)
    }

    fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }
}
