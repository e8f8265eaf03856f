//! Subcommand handlers.

use crate::{Cli, Commands};
use anyhow::Context;
use hubbridge_mcp::negotiate;
use hubbridge_tools::config::{self, ProcessEnv};
use hubbridge_tools::{HostConfig, HubBridge, ToolContext, ToolRegistry};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let host_config = HostConfig::load(cli.config.as_deref())
        .await
        .context("Failed to load host configuration")?;

    let bridge = Arc::new(HubBridge::default());
    bridge.config(host_config);

    let (tool, args) = match cli.command {
        Commands::Tools => return print_tools(&ToolRegistry::with_hub(bridge)),
        Commands::Endpoint => return print_endpoint(&bridge),
        Commands::Search {
            query,
            limit,
            retries,
            raw,
        } => (
            "hub_search",
            json!({ "query": query, "limit": limit, "retries": retries, "raw": raw }),
        ),
        Commands::Describe { tool, retries, raw } => (
            "hub_describe",
            json!({ "toolName": tool, "retries": retries, "raw": raw }),
        ),
        Commands::Call {
            tool,
            arguments,
            retries,
            no_retry_mutating,
            raw,
        } => (
            "hub_call",
            json!({
                "toolName": tool,
                "arguments": arguments,
                "retries": retries,
                "allowRetryForMutating": !no_retry_mutating,
                "raw": raw,
            }),
        ),
    };

    let registry = ToolRegistry::with_hub(bridge.clone());
    let ctx = ToolContext::new(format!("cli-{}", std::process::id()));
    cancel_on_ctrl_c(ctx.abort.clone());

    let result = registry.execute(tool, args, &ctx).await;
    bridge.close().await;

    let output = result?;
    debug!(title = %output.title, "Tool finished");
    println!("{}", output.output);
    Ok(())
}

fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}

fn print_tools(registry: &ToolRegistry) -> anyhow::Result<()> {
    let tools: Vec<Value> = registry
        .list()
        .into_iter()
        .filter_map(|id| registry.get(id))
        .map(|tool| {
            json!({
                "id": tool.id(),
                "description": tool.description(),
                "parameters": tool.parameters_schema(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}

fn print_endpoint(bridge: &HubBridge) -> anyhow::Result<()> {
    let endpoint = bridge.endpoint()?;
    let hint = config::transport_hint(&ProcessEnv);
    let mode = negotiate(&endpoint.url, hint.as_deref());

    let redacted = endpoint.redacted();
    let summary = json!({
        "connector": config::connector_name(&ProcessEnv),
        "url": redacted.url,
        "transport": mode.as_str(),
        "headers": redacted.headers,
    });

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
