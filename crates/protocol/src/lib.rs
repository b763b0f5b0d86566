//! Wire definitions for the chatnest gateway.
//!
//! - [`ErrorShape`] is the body of every failed HTTP response.
//! - [`TelemetryFrame`] is pushed over the tool-log WebSocket: one
//!   `snapshot`, then `tool_log` entries, and `ping` while idle.
//! - [`mcp`] holds the JSON-RPC 2.0 / MCP types for the assistant surface.

pub mod mcp;

use {
    chatnest_common::Platform,
    chatnest_telemetry::{TelemetryEntry, ToolStatus},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

// ── Constants ────────────────────────────────────────────────────────────────

/// Idle time on the tool-log socket before a ping frame is sent.
pub const PING_INTERVAL_MS: u64 = 30_000; // 30s
/// Client-side delay before reconnecting a dropped tool-log socket.
pub const RECONNECT_BACKOFF_MS: u64 = 3_000; // 3s

// ── Error codes ──────────────────────────────────────────────────────────────

pub mod error_codes {
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const PROVIDER_FAILED: &str = "PROVIDER_FAILED";
    pub const ASSIST_FAILED: &str = "ASSIST_FAILED";
}

// ── Error shape ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(rename = "retryAfterMs", skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl ErrorShape {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            platform: None,
            retry_after_ms: None,
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    #[must_use]
    pub fn with_retry_after(mut self, retry_after_ms: Option<u64>) -> Self {
        self.retry_after_ms = retry_after_ms;
        self
    }
}

// ── Tool log ─────────────────────────────────────────────────────────────────

/// One tool-log row as clients render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolLogRow {
    pub id: u64,
    pub tool_name: String,
    pub platform: Option<Platform>,
    pub status: ToolStatus,
    pub duration_ms: Option<u64>,
    pub result_summary: String,
    pub called_at: DateTime<Utc>,
}

impl From<&TelemetryEntry> for ToolLogRow {
    fn from(entry: &TelemetryEntry) -> Self {
        Self {
            id: entry.id,
            tool_name: entry.tool.clone(),
            platform: entry.platform,
            status: entry.status,
            duration_ms: entry.duration_ms,
            result_summary: entry.result.clone(),
            called_at: entry.started_at,
        }
    }
}

/// Server push on the tool-log socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryFrame {
    /// Newest first. Always the first frame on a connection.
    Snapshot { entries: Vec<ToolLogRow> },
    ToolLog { entry: ToolLogRow },
    Ping,
}

impl TelemetryFrame {
    pub fn snapshot(entries: &[TelemetryEntry]) -> Self {
        Self::Snapshot {
            entries: entries.iter().map(ToolLogRow::from).collect(),
        }
    }

    pub fn entry(entry: &TelemetryEntry) -> Self {
        Self::ToolLog {
            entry: entry.into(),
        }
    }
}
