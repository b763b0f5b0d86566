/// Config schema types (server, providers, AI backends, inbox, telemetry).
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatnestConfig {
    pub server: ServerConfig,
    /// Force the demo adapters for every provider, regardless of credentials.
    pub force_mock: bool,
    pub gmail: GmailConfig,
    pub slack: SlackConfig,
    pub telegram: TelegramConfig,
    pub ai: AiConfig,
    pub inbox: InboxConfig,
    pub telemetry: TelemetryConfig,
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on. Defaults to 8000.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

// ── Providers ───────────────────────────────────────────────────────────────

/// Gmail REST access. The OAuth consent flow that produces the token lives
/// outside this process; we only read the resulting token.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailConfig {
    /// Authorized-user token JSON, inline. Takes precedence over `token_path`.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token_json: Option<Secret<String>>,
    /// Path to an authorized-user token file (`token.json`).
    pub token_path: Option<PathBuf>,
    /// Mailbox user id; `me` is the authenticated account.
    pub user: String,
    pub api_base: String,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            token_json: None,
            token_path: None,
            user: "me".into(),
            api_base: "https://gmail.googleapis.com".into(),
        }
    }
}

impl std::fmt::Debug for GmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailConfig")
            .field("token_json", &self.token_json.as_ref().map(|_| "[REDACTED]"))
            .field("token_path", &self.token_path)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`).
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub bot_token: Option<Secret<String>>,
    pub default_channel: String,
    /// Upper bound on channels scanned per fetch.
    pub max_channels: usize,
    pub api_base: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            default_channel: "general".into(),
            max_channels: 10,
            api_base: "https://slack.com/api".into(),
        }
    }
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("default_channel", &self.default_channel)
            .field("max_channels", &self.max_channels)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub bot_token: Option<Secret<String>>,
    /// HTTP or SOCKS5 proxy for regions where api.telegram.org is blocked.
    pub proxy_url: Option<String>,
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            proxy_url: None,
            api_base: "https://api.telegram.org".into(),
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("proxy_url", &self.proxy_url)
            .finish_non_exhaustive()
    }
}

// ── AI ──────────────────────────────────────────────────────────────────────

/// Which inference backend to try before falling back locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderPreference {
    /// Gemini when an API key is configured, Ollama otherwise.
    #[default]
    Auto,
    Gemini,
    Ollama,
    /// Never call a backend; always use the local fallback.
    None,
}

impl std::str::FromStr for AiProviderPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            "none" | "off" => Ok(Self::None),
            other => Err(format!("unknown AI provider preference: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: AiProviderPreference,
    /// Upper bound on a single inference call, in seconds.
    pub timeout_secs: u64,
    pub gemini: GeminiConfig,
    pub ollama: OllamaConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProviderPreference::default(),
            timeout_secs: 20,
            gemini: GeminiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
}

impl GeminiConfig {
    /// True when a non-blank API key is present.
    pub fn has_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            api_base: "https://generativelanguage.googleapis.com".into(),
        }
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    /// Pin a model; when unset the best locally available model is discovered.
    pub model: Option<String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: None,
        }
    }
}

// ── Inbox / telemetry ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    /// Per-provider deadline for a single fetch, in seconds.
    pub fetch_timeout_secs: u64,
    /// Listing limit when the caller does not pass one.
    pub default_limit: usize,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 10,
            default_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Entries retained in the live tool-call window.
    pub capacity: usize,
    /// Events buffered per subscriber before it is dropped as too slow.
    pub subscriber_buffer: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            capacity: 30,
            subscriber_buffer: 64,
        }
    }
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
