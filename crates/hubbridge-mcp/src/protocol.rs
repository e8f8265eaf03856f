//! MCP protocol types.
//!
//! Implements the JSON-RPC based MCP protocol.
//! See: <https://spec.modelcontextprotocol.io/>

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// MCP protocol version.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC request (or notification if id is None).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Request ID. None for notifications (which don't expect a response).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Parse a frame that replies to one of our requests.
    ///
    /// Server-initiated requests and notifications carry `method` and are
    /// rejected, as is anything without exactly one of `result` and `error`.
    pub fn parse_reply(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        let frame = value.as_object()?;
        if frame.contains_key("method") || frame.contains_key("result") == frame.contains_key("error") {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// JSON-RPC error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC notification (no id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a new JSON-RPC notification.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

/// MCP initialization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: Value,
    pub client_info: ClientInfo,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: Value::Object(Map::new()),
            client_info: ClientInfo::default(),
        }
    }
}

/// Client info.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "hubbridge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// MCP initialization result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    pub server_info: ServerInfo,
}

/// Server info.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Tool call parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// Tool call result.
///
/// Fields this crate does not model are kept in `extra` so the result can be
/// serialized back unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ToolContent>>,
    /// Error flag exactly as the server sent it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    /// Structured payload, when the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolCallResult {
    /// Build a successful result holding a single text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Some(vec![ToolContent::text(text)]),
            is_error: None,
            structured_content: None,
            extra: Map::new(),
        }
    }

    /// Mark this result as an error.
    pub fn into_error(mut self) -> Self {
        self.is_error = Some(true);
        self
    }

    /// Whether the remote tool reported an error. An absent flag means success.
    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }

    /// The text of the only content part, if the content is exactly one text part.
    pub fn single_text(&self) -> Option<&str> {
        match self.content.as_deref() {
            Some([ToolContent::Text { text, .. }]) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Tool content item.
///
/// Any part with `type: "text"` and a string `text` is a text part; its other
/// keys (`annotations`, `_meta`, ...) ride along in `extra`. Every other part
/// is carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ToolContent {
    Text {
        text: String,
        extra: Map<String, Value>,
    },
    Other(Value),
}

impl ToolContent {
    /// Create a plain text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            extra: Map::new(),
        }
    }
}

impl From<Value> for ToolContent {
    fn from(value: Value) -> Self {
        let mut map = match value {
            Value::Object(map) => map,
            other => return Self::Other(other),
        };
        if map.get("type").and_then(Value::as_str) != Some("text") {
            return Self::Other(Value::Object(map));
        }
        match map.remove("text") {
            Some(Value::String(text)) => {
                map.remove("type");
                Self::Text { text, extra: map }
            }
            other => {
                if let Some(text) = other {
                    map.insert("text".to_string(), text);
                }
                Self::Other(Value::Object(map))
            }
        }
    }
}

impl From<ToolContent> for Value {
    fn from(content: ToolContent) -> Self {
        match content {
            ToolContent::Text { text, extra } => {
                let mut map = Map::new();
                map.insert("type".to_string(), Value::String("text".to_string()));
                map.insert("text".to_string(), Value::String(text));
                map.extend(extra);
                Value::Object(map)
            }
            ToolContent::Other(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_rpc_request_serialization() {
        let req = JsonRpcRequest::new(1, "initialize", Some(json!({"test": true})));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"initialize\""));
    }

    #[test]
    fn test_parse_reply_accepts_result_or_error() {
        let ok = JsonRpcResponse::parse_reply(r#"{"jsonrpc":"2.0","id":2,"result":{}}"#).unwrap();
        assert_eq!(ok.id, 2);
        let err = JsonRpcResponse::parse_reply(
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"nope"}}"#,
        )
        .unwrap();
        assert_eq!(err.error.unwrap().code, -32601);
    }

    #[test]
    fn test_parse_reply_rejects_server_requests() {
        assert!(JsonRpcResponse::parse_reply(r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#).is_none());
        assert!(JsonRpcResponse::parse_reply(
            r#"{"jsonrpc":"2.0","id":2,"method":"sampling/createMessage","result":{}}"#
        )
        .is_none());
        assert!(JsonRpcResponse::parse_reply(r#"{"jsonrpc":"2.0","id":2}"#).is_none());
        assert!(JsonRpcResponse::parse_reply("not json").is_none());
    }

    #[test]
    fn test_notification_has_no_id() {
        let n = JsonRpcNotification::new("notifications/initialized", None);
        let json = serde_json::to_value(&n).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("params").is_none());
    }

    #[test]
    fn test_initialize_params() {
        let params = InitializeParams::default();
        assert_eq!(params.protocol_version, PROTOCOL_VERSION);
        assert_eq!(params.client_info.name, "hubbridge");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["clientInfo"]["name"], "hubbridge");
        assert_eq!(json["capabilities"], json!({}));
    }

    #[test]
    fn test_tool_content_text() {
        let content: ToolContent =
            serde_json::from_value(json!({"type": "text", "text": "Hello"})).unwrap();
        assert_eq!(content, ToolContent::text("Hello"));
    }

    #[test]
    fn test_tool_content_other_kept_verbatim() {
        let image = json!({"type": "image", "data": "aGk=", "mimeType": "image/png"});
        let content: ToolContent = serde_json::from_value(image.clone()).unwrap();
        assert_eq!(content, ToolContent::Other(image.clone()));
        assert_eq!(serde_json::to_value(&content).unwrap(), image);
    }

    #[test]
    fn test_text_with_meta_stays_text() {
        let part = json!({"type": "text", "text": "hi", "_meta": {"x": 1}});
        let content: ToolContent = serde_json::from_value(part.clone()).unwrap();
        assert!(matches!(&content, ToolContent::Text { text, .. } if text == "hi"));
        assert_eq!(serde_json::to_value(&content).unwrap(), part);
    }

    #[test]
    fn test_text_part_with_non_string_text_is_other() {
        let part = json!({"type": "text", "text": 42});
        let content: ToolContent = serde_json::from_value(part.clone()).unwrap();
        assert_eq!(content, ToolContent::Other(part));
    }

    #[test]
    fn test_explicit_is_error_false_is_kept() {
        let raw = json!({"content": [{"type": "text", "text": "ok"}], "isError": false});
        let result: ToolCallResult = serde_json::from_value(raw.clone()).unwrap();
        assert!(!result.is_error());
        assert_eq!(serde_json::to_value(&result).unwrap(), raw);
    }

    #[test]
    fn test_tool_call_result_preserves_unknown_fields() {
        let raw = json!({
            "content": [{"type": "text", "text": "ok", "annotations": {"audience": ["user"]}}],
            "isError": true,
            "_meta": {"trace": "abc"}
        });
        let result: ToolCallResult = serde_json::from_value(raw.clone()).unwrap();
        assert!(result.is_error());
        assert_eq!(result.single_text(), Some("ok"));
        assert_eq!(serde_json::to_value(&result).unwrap(), raw);
    }

    #[test]
    fn test_tool_call_result_without_content() {
        let result: ToolCallResult =
            serde_json::from_value(json!({"structuredContent": {"n": 1}})).unwrap();
        assert!(result.content.is_none());
        assert!(!result.is_error());
        assert_eq!(result.single_text(), None);
    }
}
