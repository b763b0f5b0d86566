use {
    chatnest_common::Platform,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// Lifecycle of a single tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Calling,
    Done,
    Error,
}

impl ToolStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Calling => "calling",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Calling)
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the tool log.
///
/// Created as [`ToolStatus::Calling`] and finalized exactly once; `duration_ms`
/// is set only on the terminal update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEntry {
    pub id: u64,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    pub status: ToolStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub result: String,
}

impl TelemetryEntry {
    pub fn calling(id: u64, tool: impl Into<String>, platform: Option<Platform>) -> Self {
        Self {
            id,
            tool: tool.into(),
            platform,
            status: ToolStatus::Calling,
            started_at: Utc::now(),
            duration_ms: None,
            result: String::new(),
        }
    }

    /// The terminal form of this entry.
    #[must_use]
    pub fn finished(&self, status: ToolStatus, duration_ms: u64, result: String) -> Self {
        Self {
            status,
            duration_ms: Some(duration_ms),
            result,
            ..self.clone()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
