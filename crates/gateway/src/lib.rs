//! Gateway: HTTP API, tool-log WebSocket and MCP endpoint over the inbox.
//!
//! Lifecycle:
//! 1. Load config, build the [`chatnest_inbox::InboxService`]
//! 2. Bind the HTTP server
//! 3. Serve REST routes, `/ws/tool-log` and `/mcp` until shutdown
//!
//! No domain logic lives here; handlers translate requests into inbox calls
//! and inbox errors into [`chatnest_protocol::ErrorShape`] responses.

pub mod error;
pub mod mcp;
#[cfg(feature = "metrics")]
pub mod metrics_middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod ws;

pub use {
    error::ApiError,
    mcp::McpDispatcher,
    server::{build_gateway_app, start_gateway},
    state::AppState,
};
