//! Inbox errors as HTTP responses.

use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    chatnest_channels::ProviderErrorKind,
    chatnest_inbox::Error,
    chatnest_protocol::{ErrorShape, error_codes},
    tracing::debug,
};

/// A failed request: status plus the [`ErrorShape`] body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub shape: ErrorShape,
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            shape: ErrorShape::new(error_codes::INVALID_ARGUMENT, message),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::InvalidArgument(_) => Self::invalid(message),
            Error::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                shape: ErrorShape::new(error_codes::NOT_FOUND, message),
            },
            Error::Provider(e) => {
                let retry_after_ms = match e.cause {
                    ProviderErrorKind::RateLimited { retry_after_ms } => retry_after_ms,
                    _ => None,
                };
                Self {
                    status: StatusCode::BAD_GATEWAY,
                    shape: ErrorShape::new(error_codes::PROVIDER_FAILED, message)
                        .with_platform(e.platform)
                        .with_retry_after(retry_after_ms),
                }
            },
            Error::Assist(_) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                shape: ErrorShape::new(error_codes::ASSIST_FAILED, message),
            },
        }
    }
}

impl From<chatnest_common::Error> for ApiError {
    fn from(err: chatnest_common::Error) -> Self {
        Self::invalid(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!(status = %self.status, code = %self.shape.code, message = %self.shape.message, "request failed");
        (self.status, Json(self.shape)).into_response()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        chatnest_assist::AssistError,
        chatnest_channels::ProviderError,
        chatnest_common::Platform,
    };

    #[test]
    fn status_per_error_class() {
        let cases = [
            (Error::invalid("limit"), StatusCode::BAD_REQUEST, error_codes::INVALID_ARGUMENT),
            (Error::not_found("gmail:x"), StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            (
                Error::Provider(ProviderError::api(Platform::Slack, "channel_not_found")),
                StatusCode::BAD_GATEWAY,
                error_codes::PROVIDER_FAILED,
            ),
            (
                Error::Assist(AssistError::EmptyInput),
                StatusCode::UNPROCESSABLE_ENTITY,
                error_codes::ASSIST_FAILED,
            ),
        ];
        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status, status);
            assert_eq!(api.shape.code, code);
        }
    }

    #[test]
    fn rate_limits_carry_retry_hint() {
        let api = ApiError::from(Error::Provider(ProviderError::rate_limited(
            Platform::Telegram,
            Some(3000),
        )));
        assert_eq!(api.shape.platform, Some(Platform::Telegram));
        assert_eq!(api.shape.retry_after_ms, Some(3000));
    }
}
