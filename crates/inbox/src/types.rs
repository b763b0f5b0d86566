//! Request and response shapes of the inbox operations.

use std::collections::BTreeMap;

use {
    chatnest_common::Platform,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformStatus {
    pub connected: bool,
    pub unread: usize,
    /// Why the provider serves demo data; absent when connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboxStatus {
    /// True when no provider is connected.
    pub demo_mode: bool,
    pub platforms: BTreeMap<Platform, PlatformStatus>,
    pub total_unread: usize,
    pub server_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshedPlatform {
    pub count: usize,
    pub demo_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub platforms: BTreeMap<Platform, RefreshedPlatform>,
    pub unread: BTreeMap<Platform, usize>,
    pub total_unread: usize,
}

/// A reply to a stored message. Routing fields left empty are filled from
/// the stored message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReplyRequest {
    pub message_id: String,
    /// When given, must match the platform in `message_id`.
    pub platform: Option<Platform>,
    pub thread_id: String,
    pub channel: String,
    pub chat_id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Draft the body from `original_body` before sending.
    pub use_ai_draft: bool,
    pub original_body: String,
    /// Name used in a drafted greeting.
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyOutcome {
    pub sent: bool,
    /// True when the reply went to the demo adapter.
    pub demo_mode: bool,
    pub platform: Platform,
    pub body_sent: String,
    pub ai_drafted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_message_id: Option<String>,
}

/// Summarize either `body` or, when it is empty, the stored message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SummarizeRequest {
    pub message_id: Option<String>,
    pub platform: Option<Platform>,
    pub sender: String,
    pub body: String,
}

/// Summarize the stored messages of one thread or chat.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SummarizeThreadRequest {
    /// `thread_id` of any message in the thread.
    pub thread_id: String,
    /// Most recent messages to include; defaults to 20.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadSummary {
    pub thread_id: String,
    pub platform: Platform,
    pub message_count: usize,
    pub summary: String,
    pub model_name: String,
    pub used_primary: bool,
}
