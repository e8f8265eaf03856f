//! Model Context Protocol (MCP) client for hubbridge.
//!
//! Connects to one remote tool hub at a time and keeps that connection alive
//! across calls.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────────┐     ┌────────────┐     ┌─────────┐
//! │  hubbridge  │────▶│ SessionManager │────▶│ McpClient  │────▶│   Hub   │
//! │   (tools)   │◀────│  (one slot)    │◀────│ Transport  │◀────│         │
//! └─────────────┘     └────────────────┘     └────────────┘     └─────────┘
//! ```
//!
//! # Supported Transports
//!
//! - **Streamable HTTP**: every message is a POST; responses are JSON or an
//!   event stream
//! - **SSE**: a long-lived event stream plus POSTs to the announced endpoint
//!
//! [`negotiate`] picks one from a hint or the URL shape.
//!
//! # Example
//!
//! ```no_run
//! use hubbridge_mcp::{negotiate, Endpoint, HttpTransportFactory, SessionManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> hubbridge_mcp::McpResult<()> {
//! let sessions = SessionManager::new(Arc::new(HttpTransportFactory::default()));
//!
//! let endpoint = Endpoint::new("https://hub.example.com/mcp")
//!     .with_header("Authorization", "Bearer secret");
//! let mode = negotiate(&endpoint.url, None);
//!
//! let client = sessions.acquire(&endpoint, mode).await?;
//! let result = client
//!     .call_tool("search_tools", serde_json::json!({ "query": "issues" }))
//!     .await?;
//! println!("{:?}", result.single_text());
//!
//! sessions.close().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod endpoint;
mod error;
pub mod http;
mod negotiate;
pub mod protocol;
mod session;
pub mod sse;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
mod transport;

pub use client::McpClient;
pub use endpoint::{Endpoint, SessionFingerprint};
pub use error::{McpError, McpResult, REQUEST_TIMEOUT_CODE};
pub use http::{HttpConfig, StreamableHttpTransport};
pub use negotiate::{negotiate, TransportMode};
pub use protocol::{ToolCallResult, ToolContent};
pub use session::SessionManager;
pub use sse::{SseConfig, SseTransport};
pub use transport::{HttpTransportFactory, Transport, TransportFactory, DEFAULT_REQUEST_TIMEOUT};
