//! hubbridge - use a remote MCP tool hub from the command line.
//!
//! Tool output goes to stdout; logs go to stderr.

mod commands;

use clap::{Parser, Subcommand};
use hubbridge_util::{LogConfig, LogLevel};
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hubbridge")]
#[command(author, version, about = "Search, describe and call tools on a remote MCP hub", long_about = None)]
struct Cli {
    /// Host configuration file (default: <config dir>/hubbridge/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the hub for tools
    Search {
        /// What the tool should do
        query: String,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<u64>,
        /// Retries after a timeout (0-3)
        #[arg(long)]
        retries: Option<u32>,
        /// Print the full JSON result
        #[arg(long)]
        raw: bool,
    },
    /// Show a hub tool's input schema
    Describe {
        /// Exact tool name
        tool: String,
        /// Retries after a timeout (0-3)
        #[arg(long)]
        retries: Option<u32>,
        /// Print the full JSON result
        #[arg(long)]
        raw: bool,
    },
    /// Call a hub tool
    Call {
        /// Exact tool name
        tool: String,
        /// Arguments as a JSON object
        arguments: Option<String>,
        /// Retries after a timeout (0-3)
        #[arg(long)]
        retries: Option<u32>,
        /// Never retry tools that may change state
        #[arg(long)]
        no_retry_mutating: bool,
        /// Print the full JSON result
        #[arg(long)]
        raw: bool,
    },
    /// Print the host tools and their parameter schemas
    Tools,
    /// Print the resolved hub endpoint with credentials masked
    Endpoint,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    hubbridge_util::log::init(LogConfig {
        level: if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        },
        include_location: false,
        ansi: std::io::stderr().is_terminal(),
    });

    commands::run(cli).await
}
