//! Streamable HTTP transport for remote MCP servers.
//!
//! Every message is an HTTP POST to the endpoint URL. The server answers
//! either with a JSON body or with an SSE stream that carries the response.

use crate::error::{McpError, McpResult};
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::{Transport, DEFAULT_REQUEST_TIMEOUT};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Method, StatusCode};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Header carrying the server-assigned session id.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Streamable HTTP transport configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// The server URL (e.g., `https://mcp.example.com/mcp`)
    pub url: String,
    /// Headers sent with every request, `Authorization` included.
    pub headers: BTreeMap<String, String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            headers: BTreeMap::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Streamable HTTP transport for remote MCP servers.
pub struct StreamableHttpTransport {
    config: HttpConfig,
    client: Client,
    connected: AtomicBool,
    /// Session ID assigned by the server
    session_id: RwLock<Option<String>>,
}

impl StreamableHttpTransport {
    /// Create a new streamable HTTP transport.
    pub fn new(config: HttpConfig) -> McpResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                McpError::connection_failed(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            client,
            connected: AtomicBool::new(false),
            session_id: RwLock::new(None),
        })
    }

    /// The session id the server assigned, if any.
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    /// Build request with common headers.
    async fn build_request(&self, method: Method) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method, &self.config.url)
            .header("Accept", "application/json, text/event-stream");

        for (name, value) in &self.config.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(ref id) = *self.session_id.read().await {
            req = req.header(SESSION_ID_HEADER, id.as_str());
        }

        req
    }

    async fn post(&self, body: String) -> McpResult<reqwest::Response> {
        let response = self
            .build_request(Method::POST)
            .await
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_send_error)?;

        // Update session ID if provided
        if let Some(session_id) = response.headers().get(SESSION_ID_HEADER) {
            if let Ok(id) = session_id.to_str() {
                *self.session_id.write().await = Some(id.to_string());
            }
        }

        check_status(response).await
    }

    /// Parse the response body for the reply to request `id`.
    async fn parse_response(
        &self,
        response: reqwest::Response,
        id: u64,
    ) -> McpResult<JsonRpcResponse> {
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.contains("text/event-stream") {
            return self.parse_event_stream(response, id).await;
        }

        let text = response.text().await.map_err(map_send_error)?;
        serde_json::from_str(&text)
            .map_err(|e| McpError::protocol_error(format!("Invalid JSON response: {e}")))
    }

    /// Read SSE events until the response with the matching id arrives.
    ///
    /// Server notifications and requests interleaved on the stream are skipped.
    async fn parse_event_stream(
        &self,
        response: reqwest::Response,
        id: u64,
    ) -> McpResult<JsonRpcResponse> {
        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut data = String::new();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(map_send_error)?;
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end_matches(|c| c == '\r' || c == '\n');

                if line.is_empty() {
                    if let Some(response) = take_response(&mut data, id) {
                        return Ok(response);
                    }
                } else if let Some(rest) = line.strip_prefix("data:") {
                    if !data.is_empty() {
                        data.push('\n');
                    }
                    data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
                }
            }
        }

        take_response(&mut data, id)
            .ok_or_else(|| McpError::protocol_error("SSE stream ended without response"))
    }
}

/// Take the buffered event data and keep it if it answers request `id`.
fn take_response(data: &mut String, id: u64) -> Option<JsonRpcResponse> {
    let payload = std::mem::take(data);
    JsonRpcResponse::parse_reply(&payload).filter(|response| response.id == id)
}

/// Map a reqwest failure to the MCP error taxonomy.
pub(crate) fn map_send_error(e: reqwest::Error) -> McpError {
    if e.is_timeout() {
        McpError::Timeout
    } else if e.is_connect() {
        McpError::connection_failed(format!("Connection failed: {e}"))
    } else {
        McpError::protocol_error(format!("Request failed: {e}"))
    }
}

/// Turn non-success HTTP statuses into errors.
pub(crate) async fn check_status(response: reqwest::Response) -> McpResult<reqwest::Response> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(McpError::AuthRequired);
    }

    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        return Err(McpError::Timeout);
    }

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(McpError::protocol_error(format!(
            "Server returned {status}: {text}"
        )));
    }

    Ok(response)
}

#[async_trait]
impl Transport for StreamableHttpTransport {
    async fn request(&self, request: JsonRpcRequest) -> McpResult<JsonRpcResponse> {
        let id = request
            .id
            .ok_or_else(|| McpError::protocol_error("Request without id"))?;
        let request_json = serde_json::to_string(&request)?;

        debug!(id, method = %request.method, "Sending HTTP request");

        let response = self.post(request_json).await?;
        self.connected.store(true, Ordering::SeqCst);
        self.parse_response(response, id).await
    }

    async fn notify(&self, notification: JsonRpcNotification) -> McpResult<()> {
        let notification_json = serde_json::to_string(&notification)?;

        debug!(method = %notification.method, "Sending HTTP notification");

        let response = self
            .build_request(Method::POST)
            .await
            .header("Content-Type", "application/json")
            .body(notification_json)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Notification returned non-success status");
        }

        Ok(())
    }

    async fn close(&self) -> McpResult<()> {
        self.connected.store(false, Ordering::SeqCst);

        // Ending the server-side session is a courtesy; the id is dropped either way.
        if self.session_id.read().await.is_some() {
            let result = self.build_request(Method::DELETE).await.send().await;
            *self.session_id.write().await = None;
            result.map_err(map_send_error)?;
        }

        debug!("Closed HTTP transport");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(url: String) -> StreamableHttpTransport {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer test-token".to_string());
        StreamableHttpTransport::new(HttpConfig {
            url,
            headers,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_http_config_default() {
        let config = HttpConfig::default();
        assert!(config.url.is_empty());
        assert!(config.headers.is_empty());
        assert_eq!(config.timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_transport_is_connected_initially_false() {
        let transport = transport("https://example.com/mcp".to_string());
        assert!(!transport.is_connected());
        assert!(!transport.is_dead());
    }

    #[tokio::test]
    async fn test_json_response_and_session_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(SESSION_ID_HEADER, "session-1")
                    .set_body_json(json!({"jsonrpc": "2.0", "id": 7, "result": {"ok": true}})),
            )
            .mount(&server)
            .await;

        let transport = transport(format!("{}/mcp", server.uri()));
        let response = transport
            .request(JsonRpcRequest::new(7, "ping", None))
            .await
            .unwrap();

        assert_eq!(response.id, 7);
        assert_eq!(response.result, Some(json!({"ok": true})));
        assert!(transport.is_connected());
        assert_eq!(transport.session_id().await.as_deref(), Some("session-1"));
    }

    #[tokio::test]
    async fn test_session_id_is_echoed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "first"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(SESSION_ID_HEADER, "abc")
                    .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "second"})))
            .and(header(SESSION_ID_HEADER, "abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"jsonrpc": "2.0", "id": 2, "result": {"echoed": true}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport(server.uri());
        transport
            .request(JsonRpcRequest::new(1, "first", None))
            .await
            .unwrap();
        let response = transport
            .request(JsonRpcRequest::new(2, "second", None))
            .await
            .unwrap();
        assert_eq!(response.result, Some(json!({"echoed": true})));
    }

    #[tokio::test]
    async fn test_event_stream_response_skips_other_messages() {
        let server = MockServer::start().await;
        let body = concat!(
            "event: message\n",
            "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}\n",
            "\n",
            "event: message\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":3,\"result\":{\"content\":[]}}\n",
            "\n",
        );
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let transport = transport(server.uri());
        let response = transport
            .request(JsonRpcRequest::new(3, "tools/call", None))
            .await
            .unwrap();
        assert_eq!(response.id, 3);
        assert_eq!(response.result, Some(json!({"content": []})));
    }

    #[test]
    fn test_take_response_ignores_server_request_with_same_id() {
        let mut data = r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#.to_string();
        assert!(take_response(&mut data, 2).is_none());
        assert!(data.is_empty());

        let mut data = r#"{"jsonrpc":"2.0","id":2,"result":{}}"#.to_string();
        assert_eq!(take_response(&mut data, 2).map(|r| r.id), Some(2));
    }

    #[tokio::test]
    async fn test_event_stream_server_request_does_not_complete_call() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"jsonrpc\":\"2.0\",\"id\":4,\"method\":\"ping\"}\n",
            "\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":4,\"result\":{\"content\":[]}}\n",
            "\n",
        );
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let response = transport(server.uri())
            .request(JsonRpcRequest::new(4, "tools/call", None))
            .await
            .unwrap();
        assert_eq!(response.result, Some(json!({"content": []})));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_required() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let transport = transport(server.uri());
        let result = transport.request(JsonRpcRequest::new(1, "ping", None)).await;
        assert!(matches!(result, Err(McpError::AuthRequired)));
    }

    #[tokio::test]
    async fn test_gateway_timeout_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(504))
            .mount(&server)
            .await;

        let transport = transport(server.uri());
        let err = transport
            .request(JsonRpcRequest::new(1, "ping", None))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Timeout));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_notify_accepts_202() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport(server.uri());
        let result = transport
            .notify(JsonRpcNotification::new("notifications/initialized", None))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_close_ends_server_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(SESSION_ID_HEADER, "to-delete")
                    .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(header(SESSION_ID_HEADER, "to-delete"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport(server.uri());
        transport
            .request(JsonRpcRequest::new(1, "ping", None))
            .await
            .unwrap();
        transport.close().await.unwrap();
        assert!(!transport.is_connected());
        assert!(transport.session_id().await.is_none());
    }

    #[tokio::test]
    async fn test_request_connection_refused() {
        let transport = transport("http://127.0.0.1:1".to_string());
        let result = transport.request(JsonRpcRequest::new(1, "test", None)).await;
        assert!(result.is_err());
    }
}
