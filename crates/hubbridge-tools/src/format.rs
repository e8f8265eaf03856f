//! Reduction of tool call results to text.

use crate::error::ToolResult;
use hubbridge_mcp::ToolCallResult;

/// Render a tool call result for the host.
///
/// `raw` serializes the whole result. Otherwise a single text part is
/// returned verbatim, and anything else is pretty-printed: the content array
/// when present, the whole result when not.
pub fn render(result: &ToolCallResult, raw: bool) -> ToolResult<String> {
    if raw {
        return Ok(serde_json::to_string_pretty(result)?);
    }

    if let Some(text) = result.single_text() {
        return Ok(text.to_string());
    }

    let rendered = match &result.content {
        Some(content) => serde_json::to_string_pretty(content)?,
        None => serde_json::to_string_pretty(result)?,
    };
    Ok(rendered)
}
