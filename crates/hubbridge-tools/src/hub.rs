//! Host tools backed by the hub.
//!
//! - `hub_search`: find tools in the hub's catalogue
//! - `hub_describe`: get a tool's input schema
//! - `hub_call`: invoke a tool

use crate::bridge::{CallRequest, DescribeRequest, HubBridge, SearchRequest};
use crate::{Tool, ToolContext, ToolError, ToolOutput, ToolResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Decode tool arguments, reporting problems as validation errors.
fn decode<T: DeserializeOwned>(args: Value) -> ToolResult<T> {
    serde_json::from_value(args).map_err(|e| ToolError::validation(format!("Invalid arguments: {e}")))
}

/// Run `operation` unless the context is cancelled first.
async fn cancellable<F>(ctx: &ToolContext, operation: F) -> ToolResult<String>
where
    F: Future<Output = ToolResult<String>>,
{
    tokio::select! {
        _ = ctx.abort.cancelled() => {
            debug!(session = %ctx.session_id, "Hub tool cancelled");
            Err(ToolError::Cancelled)
        }
        result = operation => result,
    }
}

fn retries_schema() -> Value {
    json!({
        "type": "integer",
        "minimum": 0,
        "maximum": 3,
        "description": "Retries after a timeout (default: 1)"
    })
}

fn raw_schema() -> Value {
    json!({
        "type": "boolean",
        "description": "Return the full JSON result instead of its text"
    })
}

/// Searches the hub's tool catalogue.
pub struct HubSearchTool {
    bridge: Arc<HubBridge>,
}

impl HubSearchTool {
    pub fn new(bridge: Arc<HubBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl Tool for HubSearchTool {
    fn id(&self) -> &str {
        "hub_search"
    }

    fn description(&self) -> &str {
        "Search the tool hub for tools matching a query. Returns tool names, descriptions and servers."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What the tool should do"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of results"
                },
                "retries": retries_schema(),
                "raw": raw_schema()
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let request: SearchRequest = decode(args)?;
        let title = format!("Hub search: {}", request.query);

        let output = cancellable(ctx, self.bridge.search(request)).await?;
        Ok(ToolOutput::new(title, output))
    }
}

/// Returns the schema of one hub tool.
pub struct HubDescribeTool {
    bridge: Arc<HubBridge>,
}

impl HubDescribeTool {
    pub fn new(bridge: Arc<HubBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl Tool for HubDescribeTool {
    fn id(&self) -> &str {
        "hub_describe"
    }

    fn description(&self) -> &str {
        "Describe a hub tool: its description and input schema. Use before hub_call."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "toolName": {
                    "type": "string",
                    "description": "Exact tool name from hub_search"
                },
                "retries": retries_schema(),
                "raw": raw_schema()
            },
            "required": ["toolName"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let request: DescribeRequest = decode(args)?;
        let title = format!("Hub describe: {}", request.tool_name);

        let output = cancellable(ctx, self.bridge.describe(request)).await?;
        Ok(ToolOutput::new(title, output))
    }
}

/// `hub_call` arguments. `arguments` may be a JSON object or its text.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallArgs {
    tool_name: String,
    #[serde(default)]
    arguments: Option<Value>,
    #[serde(default)]
    retries: Option<u32>,
    #[serde(default)]
    allow_retry_for_mutating: Option<bool>,
    #[serde(default)]
    raw: bool,
}

impl From<CallArgs> for CallRequest {
    fn from(args: CallArgs) -> Self {
        let arguments = match args.arguments {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text),
            Some(other) => Some(other.to_string()),
        };
        CallRequest {
            tool_name: args.tool_name,
            arguments,
            retries: args.retries,
            allow_retry_for_mutating: args.allow_retry_for_mutating,
            raw: args.raw,
        }
    }
}

/// Invokes a hub tool.
pub struct HubCallTool {
    bridge: Arc<HubBridge>,
}

impl HubCallTool {
    pub fn new(bridge: Arc<HubBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl Tool for HubCallTool {
    fn id(&self) -> &str {
        "hub_call"
    }

    fn description(&self) -> &str {
        "Call a hub tool with JSON arguments matching its input schema (see hub_describe)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "toolName": {
                    "type": "string",
                    "description": "Exact tool name from hub_search"
                },
                "arguments": {
                    "type": "string",
                    "description": "Tool arguments as a JSON object (default: {})"
                },
                "retries": retries_schema(),
                "allowRetryForMutating": {
                    "type": "boolean",
                    "description": "Retry tools that may change state after a timeout (default: true)"
                },
                "raw": raw_schema()
            },
            "required": ["toolName"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let request: CallRequest = decode::<CallArgs>(args)?.into();
        let title = format!("Hub call: {}", request.tool_name);
        let metadata = json!({
            "toolName": request.tool_name,
            "raw": request.raw,
        });

        let output = cancellable(ctx, self.bridge.call(request)).await?;
        Ok(ToolOutput::new(title, output).with_metadata(metadata))
    }
}

/// The three hub tools sharing `bridge`.
pub fn hub_tools(bridge: Arc<HubBridge>) -> Vec<crate::BoxedTool> {
    vec![
        Arc::new(HubSearchTool::new(bridge.clone())),
        Arc::new(HubDescribeTool::new(bridge.clone())),
        Arc::new(HubCallTool::new(bridge)),
    ]
}
