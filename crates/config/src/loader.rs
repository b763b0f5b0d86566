use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    schema::{AiProviderPreference, ChatnestConfig},
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chatnest.toml",
    "chatnest.yaml",
    "chatnest.yml",
    "chatnest.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ChatnestConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply environment
/// overrides.
///
/// Search order:
/// 1. `./chatnest.{toml,yaml,yml,json}`
/// 2. `~/.config/chatnest/chatnest.{toml,yaml,yml,json}`
///
/// A missing or unreadable file yields defaults; the process always starts.
pub fn discover_and_load() -> ChatnestConfig {
    let mut cfg = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                ChatnestConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            ChatnestConfig::default()
        },
    };
    apply_env_overrides(&mut cfg);
    cfg
}

/// Returns the user-global config directory (`~/.config/chatnest/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chatnest").map(|d| d.config_dir().to_path_buf())
}

fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ChatnestConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

// ── Environment overrides ───────────────────────────────────────────────────

/// Apply the conventional environment variables on top of `cfg`.
pub fn apply_env_overrides(cfg: &mut ChatnestConfig) {
    apply_env_overrides_with(cfg, |name| std::env::var(name).ok());
}

/// Same as [`apply_env_overrides`] with an injected lookup. Blank values are
/// ignored so an empty `.env` line does not wipe a configured token.
pub fn apply_env_overrides_with(cfg: &mut ChatnestConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let secret = |name: &str| get(name).map(Secret::new);

    if let Some(v) = get("FORCE_MOCK") {
        cfg.force_mock = parse_bool(&v);
    }
    if let Some(v) = secret("SLACK_BOT_TOKEN") {
        cfg.slack.bot_token = Some(v);
    }
    if let Some(v) = get("SLACK_DEFAULT_CHANNEL") {
        cfg.slack.default_channel = v;
    }
    if let Some(v) = secret("TELEGRAM_BOT_TOKEN") {
        cfg.telegram.bot_token = Some(v);
    }
    if let Some(v) = get("TELEGRAM_PROXY_URL") {
        cfg.telegram.proxy_url = Some(v);
    }
    if let Some(v) = secret("GMAIL_TOKEN_JSON") {
        cfg.gmail.token_json = Some(v);
    }
    if let Some(v) = get("GMAIL_TOKEN_PATH") {
        cfg.gmail.token_path = Some(PathBuf::from(v));
    }
    if let Some(v) = secret("GEMINI_API_KEY") {
        cfg.ai.gemini.api_key = Some(v);
    }
    if let Some(v) = get("GEMINI_MODEL") {
        cfg.ai.gemini.model = v;
    }
    if let Some(v) = get("OLLAMA_BASE_URL") {
        cfg.ai.ollama.base_url = v;
    }
    if let Some(v) = get("OLLAMA_MODEL") {
        cfg.ai.ollama.model = Some(v);
    }
    if let Some(v) = get("AI_PROVIDER") {
        match v.parse::<AiProviderPreference>() {
            Ok(pref) => cfg.ai.provider = pref,
            Err(e) => warn!(error = %e, "ignoring AI_PROVIDER"),
        }
    }
    if let Some(v) = get("UI_HOST") {
        cfg.server.bind = v;
    }
    if let Some(v) = get("UI_PORT") {
        match v.parse::<u16>() {
            Ok(port) => cfg.server.port = port,
            Err(e) => warn!(value = %v, error = %e, "ignoring UI_PORT"),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
