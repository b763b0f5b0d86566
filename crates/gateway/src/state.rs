use std::sync::Arc;

use chatnest_inbox::InboxService;

use crate::mcp::McpDispatcher;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub inbox: Arc<InboxService>,
    pub mcp: Arc<McpDispatcher>,
    pub version: &'static str,
}

impl AppState {
    pub fn new(inbox: Arc<InboxService>) -> Self {
        let version = env!("CARGO_PKG_VERSION");
        Self {
            mcp: Arc::new(McpDispatcher::new(Arc::clone(&inbox), version)),
            inbox,
            version,
        }
    }
}
