//! Tool-call telemetry.
//!
//! Every outbound call (provider fetch/send/mark-read, AI summarize/draft)
//! runs through the [`Mediator`], which records a [`TelemetryEntry`] on the
//! [`TelemetryBus`]. Observers get a snapshot followed by incremental
//! updates, and slow observers are dropped rather than waited on.

pub mod bus;
pub mod entry;
pub mod mediator;

pub use {
    bus::{
        BusEvent, DEFAULT_CAPACITY, DEFAULT_SUBSCRIBER_BUFFER, TelemetryBus, follow,
        follow_with_backoff,
    },
    entry::{TelemetryEntry, ToolStatus},
    mediator::Mediator,
};
