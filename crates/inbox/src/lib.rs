//! The unified inbox.
//!
//! [`InboxService`] owns the mode gate, the in-memory message store, the
//! AI assist and the telemetry mediator, and exposes the operations every
//! transport (HTTP, WebSocket, MCP) calls into.

pub mod error;
pub mod factory;
pub mod service;
pub mod store;
pub mod types;

pub use {
    error::{Error, Result},
    factory::build_live_adapter,
    service::{InboxService, tools},
    store::MessageStore,
    types::{
        InboxStatus, PlatformStatus, RefreshReport, RefreshedPlatform, ReplyOutcome, ReplyRequest,
        SummarizeRequest, SummarizeThreadRequest, ThreadSummary,
    },
};
