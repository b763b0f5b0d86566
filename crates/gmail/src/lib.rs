//! Gmail adapter over the Gmail REST API (`gmail/v1`).
//!
//! Reads unread inbox messages, sends threaded replies as raw RFC 822
//! messages and clears the `UNREAD` label. The OAuth access token comes from
//! an authorized-user token produced outside this process.

pub mod adapter;
pub mod mime;

pub use adapter::GmailAdapter;
