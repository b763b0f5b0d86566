//! Configuration loading, env substitution, and credential validation.
//!
//! Config files: `chatnest.toml`, `chatnest.yaml`, `chatnest.yml` or
//! `chatnest.json`, searched in `./` then the user config dir.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file, and the conventional environment variables (`SLACK_BOT_TOKEN`,
//! `FORCE_MOCK`, ...) override whatever the file says.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        AiConfig, AiProviderPreference, ChatnestConfig, GeminiConfig, GmailConfig, InboxConfig,
        OllamaConfig, ServerConfig, SlackConfig, TelegramConfig, TelemetryConfig,
    },
    validate::{CredentialIssue, Diagnostic, Severity, ValidationResult},
};
