use {
    async_trait::async_trait,
    chatnest_common::Platform,
    serde::{Deserialize, Serialize},
};

use crate::error::Result;

/// Which implementation is serving a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterMode {
    Live,
    Mock,
}

impl AdapterMode {
    pub fn is_live(self) -> bool {
        self == Self::Live
    }
}

impl std::fmt::Display for AdapterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::Mock => "mock",
        })
    }
}

/// A provider-native message payload, before normalization.
///
/// Live adapters pass the provider's own JSON object through; the mock
/// adapter synthesizes objects of the same shape so both share one
/// normalization path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub platform: Platform,
    pub payload: serde_json::Value,
}

impl RawMessage {
    pub fn new(platform: Platform, payload: serde_json::Value) -> Self {
        Self { platform, payload }
    }
}

/// Where a reply goes. Each provider reads the identifiers it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTarget {
    /// Platform-qualified id of the message being answered, if any.
    #[serde(default)]
    pub message_id: Option<String>,
    /// Gmail thread id or Slack `slack:thread:<channel>:<ts>` id.
    #[serde(default)]
    pub thread_id: String,
    /// Slack channel name or id.
    #[serde(default)]
    pub channel: String,
    /// Telegram chat id.
    #[serde(default)]
    pub chat_id: String,
    /// Gmail recipient address.
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub subject: String,
    pub body: String,
}

/// What a provider returned for a successful send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Provider id of the posted message, when the provider reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_message_id: Option<String>,
}

/// The capability set every provider implementation offers.
///
/// Implementations never panic or leak transport errors; every failure comes
/// back as a [`crate::ProviderError`].
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    fn mode(&self) -> AdapterMode;

    /// Fetch up to `limit` recent messages in provider-native form.
    async fn fetch(&self, limit: usize) -> Result<Vec<RawMessage>>;

    async fn send(&self, target: &SendTarget) -> Result<SendReceipt>;

    /// Mark a message read on the provider, given its provider-native id.
    /// Providers without per-message read state treat this as a no-op.
    async fn mark_read(&self, native_id: &str) -> Result<()> {
        let _ = native_id;
        Ok(())
    }
}
