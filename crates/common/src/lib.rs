//! Shared types and error definitions used across all chatnest crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, Result},
    types::{Message, MessageScope, Platform},
};
