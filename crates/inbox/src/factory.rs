use std::sync::Arc;

use {
    chatnest_channels::ProviderAdapter,
    chatnest_common::Platform,
    chatnest_config::ChatnestConfig,
    chatnest_gmail::GmailAdapter,
    chatnest_slack::SlackAdapter,
    chatnest_telegram::TelegramAdapter,
};

/// Builds the live adapter for `platform`. Passed to the mode gate, which
/// only calls it once credentials have passed validation.
pub fn build_live_adapter(
    platform: Platform,
    cfg: &ChatnestConfig,
) -> Result<Arc<dyn ProviderAdapter>, String> {
    let built: chatnest_channels::Result<Arc<dyn ProviderAdapter>> = match platform {
        Platform::Gmail => GmailAdapter::new(&cfg.gmail).map(|a| Arc::new(a) as _),
        Platform::Slack => SlackAdapter::new(&cfg.slack).map(|a| Arc::new(a) as _),
        Platform::Telegram => TelegramAdapter::new(&cfg.telegram).map(|a| Arc::new(a) as _),
    };
    built.map_err(|e| e.to_string())
}
