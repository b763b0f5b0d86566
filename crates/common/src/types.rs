//! Canonical, provider-agnostic message types.

use std::{fmt, str::FromStr};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

/// Separator between the platform prefix and the provider-native id.
const ID_SEP: char = ':';

// ── Platform ────────────────────────────────────────────────────────────────

/// A messaging provider the inbox aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Gmail,
    Slack,
    Telegram,
}

impl Platform {
    /// All platforms, in display order.
    pub const ALL: [Platform; 3] = [Self::Gmail, Self::Slack, Self::Telegram];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gmail => "gmail",
            Self::Slack => "slack",
            Self::Telegram => "telegram",
        }
    }

    /// Human-facing name used in reply templates and logs.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Gmail => "Gmail",
            Self::Slack => "Slack",
            Self::Telegram => "Telegram",
        }
    }

    /// Build a platform-qualified message id (`gmail:18c2...`).
    #[must_use]
    pub fn qualify(self, native_id: &str) -> String {
        format!("{}{ID_SEP}{native_id}", self.as_str())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gmail" => Ok(Self::Gmail),
            "slack" => Ok(Self::Slack),
            "telegram" => Ok(Self::Telegram),
            _ => Err(Error::unknown_platform(s)),
        }
    }
}

/// Split a platform-qualified id into its platform and native part.
///
/// The native part may itself contain `:` (Slack ids embed the channel and
/// timestamp), only the first separator is significant.
pub fn split_message_id(id: &str) -> Result<(Platform, &str)> {
    let (prefix, native) = id
        .split_once(ID_SEP)
        .ok_or_else(|| Error::malformed_id(id))?;
    if native.trim().is_empty() {
        return Err(Error::malformed_id(id));
    }
    let platform = prefix
        .parse::<Platform>()
        .map_err(|_| Error::malformed_id(id))?;
    Ok((platform, native))
}

// ── Scope ───────────────────────────────────────────────────────────────────

/// Which providers a listing covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageScope {
    #[default]
    All,
    Only(Platform),
}

impl MessageScope {
    /// Parse an optional query value; absent, empty and `"all"` mean every provider.
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::All),
            Some(v) if v.eq_ignore_ascii_case("all") => Ok(Self::All),
            Some(v) => v.parse().map(Self::Only),
        }
    }

    pub fn platforms(self) -> Vec<Platform> {
        match self {
            Self::All => Platform::ALL.to_vec(),
            Self::Only(p) => vec![p],
        }
    }

    pub fn includes(self, platform: Platform) -> bool {
        match self {
            Self::All => true,
            Self::Only(p) => p == platform,
        }
    }
}

// ── Message ─────────────────────────────────────────────────────────────────

/// The normalized message shape every consumer operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Platform-qualified id, unique within its platform namespace.
    pub id: String,
    pub platform: Platform,
    /// Sender display name.
    pub sender: String,
    /// Sender address or handle; empty when the provider has none.
    pub sender_email: String,
    /// Empty when the provider has no subject concept.
    pub subject: String,
    /// Channel / chat label (`#general`, `DM`); empty when not applicable.
    pub channel: String,
    pub preview: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub is_unread: bool,
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    /// Provider-specific fields that have no canonical slot.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    /// The provider-native part of [`Message::id`].
    pub fn native_id(&self) -> &str {
        self.id
            .split_once(ID_SEP)
            .map(|(_, native)| native)
            .unwrap_or(&self.id)
    }

    /// Fold a freshly fetched copy of this message into the stored one.
    ///
    /// Attributes are refreshed, but a message that was already read stays
    /// read: `is_unread` only ever moves from true to false.
    pub fn refresh_from(&mut self, fresh: Message) {
        let was_unread = self.is_unread;
        *self = fresh;
        self.is_unread = was_unread && self.is_unread;
    }

    /// Clear the unread flag. Returns whether the flag changed.
    pub fn mark_read(&mut self) -> bool {
        std::mem::replace(&mut self.is_unread, false)
    }
}
