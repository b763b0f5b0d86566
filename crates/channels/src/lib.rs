//! Provider adapters and everything that sits directly on top of them.
//!
//! Each messaging provider (Gmail, Slack, Telegram) implements
//! [`ProviderAdapter`]; [`MockAdapter`] stands in when live credentials are
//! missing or demo mode is forced. The [`ModeGate`] picks one per provider,
//! and [`normalize`] turns whatever they return into canonical messages.

pub mod adapter;
pub mod error;
pub mod gate;
pub mod http;
pub mod mock;
pub mod normalize;

pub use {
    adapter::{AdapterMode, ProviderAdapter, RawMessage, SendReceipt, SendTarget},
    error::{ProviderError, ProviderErrorKind, Result},
    gate::{LiveAdapterFactory, MockReason, ModeGate},
    mock::MockAdapter,
    normalize::{PREVIEW_CHARS, make_preview, normalize},
};
