use std::time::Duration;

/// Failure of an inference backend. Always absorbed by the local fallback.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("backend timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("backend returned an empty response")]
    Empty,

    #[error("unexpected backend response: {0}")]
    Decode(String),
}

impl InferenceError {
    #[must_use]
    pub fn unreachable(err: impl std::fmt::Display) -> Self {
        Self::Unreachable(err.to_string())
    }

    #[must_use]
    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// The one failure surfaced to callers: nothing to work with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistError {
    #[error("message body is empty")]
    EmptyInput,
}

pub type Result<T> = std::result::Result<T, AssistError>;
