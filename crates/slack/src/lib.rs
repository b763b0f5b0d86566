//! Slack Web API adapter.
//!
//! Reads recent history from the channels the bot is a member of and posts
//! replies with `chat.postMessage`. Slack has no per-user read state for bot
//! tokens, so marking a message read is a no-op.

pub mod adapter;

pub use adapter::SlackAdapter;
