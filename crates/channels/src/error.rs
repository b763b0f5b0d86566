use std::time::Duration;

use chatnest_common::Platform;

/// Crate-wide result type for adapter operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// A failed call against a messaging provider.
///
/// Adapters return this instead of letting transport or API faults escape;
/// callers record it and carry on with the other providers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{platform}: {cause}")]
pub struct ProviderError {
    pub platform: Platform,
    pub cause: ProviderErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderErrorKind {
    /// Could not reach the provider (DNS, connect, reset).
    #[error("transport failure: {0}")]
    Transport(String),

    /// Credentials were rejected (HTTP 401/403 or an auth error envelope).
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The provider asked us to back off.
    #[error("rate limited{}", retry_after_ms.map(|ms| format!(" (retry after {ms} ms)")).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// The provider answered with an error of its own.
    #[error("api error: {0}")]
    Api(String),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The response did not have the shape we expected.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Caller passed identifiers the provider cannot act on.
    #[error("invalid target: {0}")]
    InvalidTarget(String),
}

impl ProviderError {
    #[must_use]
    pub fn new(platform: Platform, cause: ProviderErrorKind) -> Self {
        Self { platform, cause }
    }

    #[must_use]
    pub fn transport(platform: Platform, message: impl std::fmt::Display) -> Self {
        Self::new(platform, ProviderErrorKind::Transport(message.to_string()))
    }

    #[must_use]
    pub fn auth(platform: Platform, message: impl std::fmt::Display) -> Self {
        Self::new(platform, ProviderErrorKind::Auth(message.to_string()))
    }

    #[must_use]
    pub fn api(platform: Platform, message: impl std::fmt::Display) -> Self {
        Self::new(platform, ProviderErrorKind::Api(message.to_string()))
    }

    #[must_use]
    pub fn decode(platform: Platform, message: impl std::fmt::Display) -> Self {
        Self::new(platform, ProviderErrorKind::Decode(message.to_string()))
    }

    #[must_use]
    pub fn invalid_target(platform: Platform, message: impl std::fmt::Display) -> Self {
        Self::new(platform, ProviderErrorKind::InvalidTarget(message.to_string()))
    }

    #[must_use]
    pub fn timeout(platform: Platform, after: Duration) -> Self {
        Self::new(platform, ProviderErrorKind::Timeout(after))
    }

    #[must_use]
    pub fn rate_limited(platform: Platform, retry_after_ms: Option<u64>) -> Self {
        Self::new(platform, ProviderErrorKind::RateLimited { retry_after_ms })
    }
}
