use thiserror::Error;

/// Errors raised while parsing canonical identifiers.
///
/// Both variants belong to the programmer-error class: a caller handed us an
/// identifier that no adapter could have produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown platform: {0:?}")]
    UnknownPlatform(String),

    #[error("malformed message id: {0:?} (expected \"<platform>:<id>\")")]
    MalformedMessageId(String),
}

impl Error {
    #[must_use]
    pub fn unknown_platform(name: impl Into<String>) -> Self {
        Self::UnknownPlatform(name.into())
    }

    #[must_use]
    pub fn malformed_id(id: impl Into<String>) -> Self {
        Self::MalformedMessageId(id.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
