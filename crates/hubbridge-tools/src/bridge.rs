//! The hub façade: search, describe and call through one managed session.

use crate::args::parse_arguments;
use crate::config::{self, EnvSource, HostConfig, ProcessEnv};
use crate::error::{ConfigError, ToolResult};
use crate::format::render;
use crate::mutation::{MutationClassifier, VerbHeuristic};
use crate::retry::{with_retries, DEFAULT_RETRIES};
use hubbridge_mcp::{
    negotiate, Endpoint, HttpTransportFactory, McpResult, SessionManager, ToolCallResult,
    TransportFactory, TransportMode,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Remote tool that searches the hub's catalogue.
pub const SEARCH_TOOLS: &str = "search_tools";
/// Remote tool that returns one tool's schema.
pub const DESCRIBE_TOOL: &str = "describe_tool";
/// Remote tool that invokes a catalogued tool.
pub const CALL_TOOL: &str = "call_tool";

/// Results requested from the describe fallback search.
pub const FALLBACK_SEARCH_LIMIT: u64 = 10;

const FALLBACK_MESSAGE: &str = "Fallback schema from search_tools";

/// Arrays of a search result that may hold tool entries.
const RESULT_ARRAYS: [&str; 3] = ["tools", "results", "items"];

/// Arguments of [`HubBridge::search`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub raw: bool,
}

/// Arguments of [`HubBridge::describe`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeRequest {
    pub tool_name: String,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub raw: bool,
}

/// Arguments of [`HubBridge::call`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub tool_name: String,
    /// A JSON object, as text.
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub retries: Option<u32>,
    /// Defaults to `true`.
    #[serde(default)]
    pub allow_retry_for_mutating: Option<bool>,
    #[serde(default)]
    pub raw: bool,
}

/// Exposes a remote tool hub through `search`, `describe` and `call`.
///
/// Each operation resolves the endpoint afresh, so configuration and
/// environment changes apply to the next call. Connections are reused while
/// the endpoint stays the same.
pub struct HubBridge {
    host_config: RwLock<Arc<HostConfig>>,
    env: Arc<dyn EnvSource>,
    sessions: SessionManager,
    classifier: Arc<dyn MutationClassifier>,
}

/// Builder for [`HubBridge`].
pub struct HubBridgeBuilder {
    host_config: HostConfig,
    env: Arc<dyn EnvSource>,
    factory: Option<Arc<dyn TransportFactory>>,
    classifier: Arc<dyn MutationClassifier>,
}

impl HubBridgeBuilder {
    /// Initial host configuration.
    pub fn host_config(mut self, host_config: HostConfig) -> Self {
        self.host_config = host_config;
        self
    }

    /// Environment to resolve overrides from.
    pub fn env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Transport factory. Defaults to HTTP transports with the timeout from
    /// `HUBBRIDGE_TIMEOUT_SECS`.
    pub fn transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Classifier deciding which calls are mutating.
    pub fn classifier(mut self, classifier: impl MutationClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn build(self) -> HubBridge {
        let factory = self.factory.unwrap_or_else(|| {
            Arc::new(HttpTransportFactory::new(config::request_timeout(
                self.env.as_ref(),
            )))
        });

        HubBridge {
            host_config: RwLock::new(Arc::new(self.host_config)),
            env: self.env,
            sessions: SessionManager::new(factory),
            classifier: self.classifier,
        }
    }
}

impl HubBridge {
    pub fn builder() -> HubBridgeBuilder {
        HubBridgeBuilder {
            host_config: HostConfig::default(),
            env: Arc::new(ProcessEnv),
            factory: None,
            classifier: Arc::new(VerbHeuristic::new()),
        }
    }

    /// Configuration hook: replace the host configuration used by later calls.
    pub fn config(&self, host_config: HostConfig) {
        let mut slot = self
            .host_config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Arc::new(host_config);
    }

    fn host_config(&self) -> Arc<HostConfig> {
        self.host_config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Resolve and validate the endpoint for the current configuration.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        config::resolve_endpoint(&self.host_config(), self.env.as_ref())
    }

    fn target(&self) -> Result<(Endpoint, TransportMode), ConfigError> {
        let endpoint = self.endpoint()?;
        let hint = config::transport_hint(self.env.as_ref());
        let mode = negotiate(&endpoint.url, hint.as_deref());
        Ok((endpoint, mode))
    }

    /// Call a remote tool, acquiring the session on every attempt.
    async fn invoke(
        &self,
        endpoint: &Endpoint,
        mode: TransportMode,
        tool: &str,
        arguments: Value,
        max_retries: u32,
    ) -> McpResult<ToolCallResult> {
        with_retries(max_retries, || {
            let arguments = arguments.clone();
            async move {
                let client = self.sessions.acquire(endpoint, mode).await?;
                client.call_tool(tool, arguments).await
            }
        })
        .await
    }

    /// Search the hub's tool catalogue.
    pub async fn search(&self, request: SearchRequest) -> ToolResult<String> {
        let (endpoint, mode) = self.target()?;

        let mut arguments = json!({ "query": request.query });
        if let Some(limit) = request.limit {
            arguments["limit"] = json!(limit);
        }

        let retries = request.retries.unwrap_or(DEFAULT_RETRIES);
        let result = self
            .invoke(&endpoint, mode, SEARCH_TOOLS, arguments, retries)
            .await?;
        render(&result, request.raw)
    }

    /// Describe a remote tool.
    ///
    /// Outside raw mode a failed describe degrades to a search for the tool
    /// name. This is best-effort: it finds the tool only if the hub ranks an
    /// exact name match within the first [`FALLBACK_SEARCH_LIMIT`] results.
    pub async fn describe(&self, request: DescribeRequest) -> ToolResult<String> {
        let (endpoint, mode) = self.target()?;
        let retries = request.retries.unwrap_or(DEFAULT_RETRIES);
        let name = request.tool_name.as_str();
        let arguments = json!({ "toolName": name });

        if request.raw {
            let result = self
                .invoke(&endpoint, mode, DESCRIBE_TOOL, arguments, retries)
                .await?;
            return render(&result, true);
        }

        let fallback_arguments = json!({ "query": name, "limit": FALLBACK_SEARCH_LIMIT });

        match self
            .invoke(&endpoint, mode, DESCRIBE_TOOL, arguments, retries)
            .await
        {
            Err(e) => {
                warn!(tool = name, error = %e, "describe_tool failed, searching instead");
                let result = self
                    .invoke(&endpoint, mode, SEARCH_TOOLS, fallback_arguments, retries)
                    .await?;
                render(&result, false)
            }
            Ok(result) if result.is_error() => {
                debug!(tool = name, "describe_tool returned an error, searching instead");
                match self
                    .invoke(&endpoint, mode, SEARCH_TOOLS, fallback_arguments, retries)
                    .await
                {
                    Ok(search) => {
                        if let Some(entry) = find_exact_match(&search, name) {
                            return Ok(serde_json::to_string_pretty(&fallback_descriptor(
                                &entry,
                            ))?);
                        }
                        debug!(tool = name, "No exact match in fallback search");
                    }
                    Err(e) => debug!(tool = name, error = %e, "Fallback search failed"),
                }
                render(&result, false)
            }
            Ok(result) => render(&result, false),
        }
    }

    /// Call a remote tool.
    ///
    /// Arguments are validated before any network activity. Calls classified
    /// as mutating are not retried when `allow_retry_for_mutating` is false.
    pub async fn call(&self, request: CallRequest) -> ToolResult<String> {
        let (endpoint, mode) = self.target()?;
        let arguments = parse_arguments(request.arguments.as_deref())?;

        let mut retries = request.retries.unwrap_or(DEFAULT_RETRIES);
        let allow_retry = request.allow_retry_for_mutating.unwrap_or(true);
        if !allow_retry && retries > 0 && self.classifier.is_mutating(&request.tool_name) {
            debug!(tool = %request.tool_name, "Not retrying mutating call");
            retries = 0;
        }

        let payload = json!({ "toolName": request.tool_name, "arguments": arguments });
        let result = self
            .invoke(&endpoint, mode, CALL_TOOL, payload, retries)
            .await?;
        render(&result, request.raw)
    }

    /// Close the hub session.
    pub async fn close(&self) {
        self.sessions.close().await;
    }
}

impl Default for HubBridge {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Parsed payload of a search result: structured content, or the single
/// text part read as JSON.
fn search_payload(result: &ToolCallResult) -> Option<Value> {
    if let Some(structured) = &result.structured_content {
        return Some(structured.clone());
    }
    serde_json::from_str(result.single_text()?).ok()
}

/// The entry named exactly `name` in a search result.
fn find_exact_match(result: &ToolCallResult, name: &str) -> Option<Value> {
    let payload = search_payload(result)?;

    let entries = match &payload {
        Value::Array(entries) => entries,
        Value::Object(map) => RESULT_ARRAYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))?,
        _ => return None,
    };

    entries
        .iter()
        .find(|entry| entry.get("name").and_then(Value::as_str) == Some(name))
        .cloned()
}

/// A minimal describe result built from a search entry.
fn fallback_descriptor(entry: &Value) -> Value {
    let mut tool = Map::new();
    for key in ["name", "description", "inputSchema", "serverName"] {
        if let Some(value) = entry.get(key) {
            tool.insert(key.to_string(), value.clone());
        }
    }

    json!({
        "tool": tool,
        "metadata": { "message": FALLBACK_MESSAGE }
    })
}
