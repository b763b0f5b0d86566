use {chatnest_assist::AssistError, chatnest_channels::ProviderError};

/// Failures surfaced by [`crate::InboxService`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller passed something no provider could have produced.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Assist(#[from] AssistError),
}

impl Error {
    #[must_use]
    pub fn invalid(message: impl std::fmt::Display) -> Self {
        Self::InvalidArgument(message.to_string())
    }

    #[must_use]
    pub fn not_found(message: impl std::fmt::Display) -> Self {
        Self::NotFound(message.to_string())
    }
}

impl From<chatnest_common::Error> for Error {
    fn from(err: chatnest_common::Error) -> Self {
        Self::invalid(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
