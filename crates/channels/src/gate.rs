//! Live vs. demo adapter selection.
//!
//! Selection happens once per provider when the gate is built from a config
//! and is only revisited by building a new gate. A runtime failure never
//! flips a provider back to demo data.

use std::{collections::BTreeMap, sync::Arc};

use {
    chatnest_common::Platform,
    chatnest_config::{ChatnestConfig, CredentialIssue, validate::check_credentials},
    tracing::info,
};

use crate::{
    adapter::{AdapterMode, ProviderAdapter},
    mock::MockAdapter,
};

/// Builds live adapters for the gate. Implemented by the inbox, which is
/// the only place that knows every concrete provider crate.
pub trait LiveAdapterFactory: Send + Sync {
    fn build(
        &self,
        platform: Platform,
        cfg: &ChatnestConfig,
    ) -> Result<Arc<dyn ProviderAdapter>, String>;
}

impl<F> LiveAdapterFactory for F
where
    F: Fn(Platform, &ChatnestConfig) -> Result<Arc<dyn ProviderAdapter>, String> + Send + Sync,
{
    fn build(
        &self,
        platform: Platform,
        cfg: &ChatnestConfig,
    ) -> Result<Arc<dyn ProviderAdapter>, String> {
        self(platform, cfg)
    }
}

/// Why a provider ended up on demo data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReason {
    ForceMock,
    Credentials(CredentialIssue),
    /// Credentials looked fine but the live adapter could not be built.
    Construction(String),
    /// Gate assembled directly from adapters.
    Injected,
}

impl std::fmt::Display for MockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ForceMock => f.write_str("force_mock is set"),
            Self::Credentials(issue) => write!(f, "{issue}"),
            Self::Construction(err) => write!(f, "live adapter unavailable: {err}"),
            Self::Injected => f.write_str("injected"),
        }
    }
}

/// Pure selection rule: force-mock wins, then credential validity.
pub fn decide(cfg: &ChatnestConfig, platform: Platform) -> Result<(), MockReason> {
    if cfg.force_mock {
        return Err(MockReason::ForceMock);
    }
    check_credentials(cfg, platform).map_err(MockReason::Credentials)
}

struct Slot {
    adapter: Arc<dyn ProviderAdapter>,
    reason: Option<MockReason>,
}

/// The resolved adapter per provider.
pub struct ModeGate {
    slots: BTreeMap<Platform, Slot>,
}

impl ModeGate {
    /// Select an adapter for every provider from `cfg`.
    pub fn select(cfg: &ChatnestConfig, live: &dyn LiveAdapterFactory) -> Self {
        Self::reselect(None, cfg, live)
    }

    /// Re-run selection for a changed config. Providers that stay on demo
    /// data keep their existing mock so message ids stay stable.
    pub fn reselect(
        previous: Option<&ModeGate>,
        cfg: &ChatnestConfig,
        live: &dyn LiveAdapterFactory,
    ) -> Self {
        let slots = Platform::ALL
            .into_iter()
            .map(|platform| {
                let built = decide(cfg, platform).and_then(|()| {
                    live.build(platform, cfg)
                        .map_err(MockReason::Construction)
                });
                let slot = match built {
                    Ok(adapter) => {
                        info!(%platform, mode = %AdapterMode::Live, "provider selected");
                        Slot {
                            adapter,
                            reason: None,
                        }
                    },
                    Err(reason) => {
                        info!(%platform, mode = %AdapterMode::Mock, %reason, "provider selected");
                        let adapter = previous
                            .and_then(|g| g.slots.get(&platform))
                            .filter(|s| s.adapter.mode() == AdapterMode::Mock)
                            .map(|s| Arc::clone(&s.adapter))
                            .unwrap_or_else(|| {
                                Arc::new(MockAdapter::new(platform)) as Arc<dyn ProviderAdapter>
                            });
                        Slot {
                            adapter,
                            reason: Some(reason),
                        }
                    },
                };
                (platform, slot)
            })
            .collect();
        Self { slots }
    }

    /// Assemble a gate from ready-made adapters. Providers without one get
    /// the default mock.
    pub fn from_adapters(adapters: impl IntoIterator<Item = Arc<dyn ProviderAdapter>>) -> Self {
        let mut slots: BTreeMap<Platform, Slot> = adapters
            .into_iter()
            .map(|adapter| {
                let reason = (adapter.mode() == AdapterMode::Mock).then_some(MockReason::Injected);
                (adapter.platform(), Slot { adapter, reason })
            })
            .collect();
        for platform in Platform::ALL {
            slots.entry(platform).or_insert_with(|| Slot {
                adapter: Arc::new(MockAdapter::new(platform)),
                reason: Some(MockReason::Injected),
            });
        }
        Self { slots }
    }

    pub fn adapter(&self, platform: Platform) -> Arc<dyn ProviderAdapter> {
        match self.slots.get(&platform) {
            Some(slot) => Arc::clone(&slot.adapter),
            None => Arc::new(MockAdapter::new(platform)),
        }
    }

    pub fn mode(&self, platform: Platform) -> AdapterMode {
        self.slots
            .get(&platform)
            .map_or(AdapterMode::Mock, |s| s.adapter.mode())
    }

    /// True iff the provider resolved to its live adapter.
    pub fn connected(&self, platform: Platform) -> bool {
        self.mode(platform).is_live()
    }

    /// True when no provider is live.
    pub fn demo_mode(&self) -> bool {
        !Platform::ALL.into_iter().any(|p| self.connected(p))
    }

    pub fn mock_reason(&self, platform: Platform) -> Option<&MockReason> {
        self.slots.get(&platform).and_then(|s| s.reason.as_ref())
    }
}
