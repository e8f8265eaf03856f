//! Tool registry.

use crate::bridge::HubBridge;
use crate::{BoxedTool, ToolContext, ToolError, ToolOutput, ToolResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, BoxedTool>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create a registry with the hub tools.
    pub fn with_hub(bridge: Arc<HubBridge>) -> Self {
        let mut registry = Self::new();
        for tool in crate::hub::hub_tools(bridge) {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool. A tool with the same ID is replaced.
    pub fn register(&mut self, tool: BoxedTool) {
        self.tools.insert(tool.id().to_string(), tool);
    }

    /// Get a tool by ID.
    pub fn get(&self, id: &str) -> Option<&BoxedTool> {
        self.tools.get(id)
    }

    /// List all tool IDs, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Execute the tool registered as `id`.
    pub async fn execute(&self, id: &str, args: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let tool = self
            .get(id)
            .ok_or_else(|| ToolError::validation(format!("Unknown tool: {id}")))?;
        tool.execute(args, ctx).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
