//! Telegram Bot API adapter.
//!
//! Polls `getUpdates` without long-polling so each inbox refresh returns
//! promptly, and sends replies with `sendMessage`. An optional proxy covers
//! networks where `api.telegram.org` is blocked.

pub mod adapter;
pub mod chunk;

pub use adapter::TelegramAdapter;
