//! HTTP plumbing shared by the live adapters.

use {
    chatnest_common::Platform,
    reqwest::{Response, StatusCode, header::HeaderMap},
};

use crate::error::{ProviderError, Result};

/// Longest provider error body we keep in an error message.
const MAX_ERROR_BODY: usize = 200;

/// Shared HTTP client for adapters that need no custom proxy settings.
///
/// Reusing it shares connection pools, DNS cache and TLS sessions.
pub fn shared_http_client() -> &'static reqwest::Client {
    static CLIENT: std::sync::LazyLock<reqwest::Client> =
        std::sync::LazyLock::new(reqwest::Client::new);
    &CLIENT
}

/// Parse a `Retry-After` header given in seconds into milliseconds.
pub fn retry_after_ms_from_headers(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?;
    let seconds = value.to_str().ok()?.trim().parse::<u64>().ok()?;
    seconds.checked_mul(1_000)
}

/// Map a `reqwest` failure onto the provider error taxonomy.
pub fn classify_transport(platform: Platform, err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::transport(platform, format!("request timed out: {err}"))
    } else if err.is_decode() {
        ProviderError::decode(platform, err)
    } else {
        ProviderError::transport(platform, err)
    }
}

/// Pass successful responses through and turn HTTP failures into errors.
pub async fn check_status(platform: Platform, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let retry_after_ms = retry_after_ms_from_headers(resp.headers());
    let body = resp.text().await.unwrap_or_default();
    Err(classify_status(platform, status, retry_after_ms, &body))
}

/// Classify a non-success status code.
pub fn classify_status(
    platform: Platform,
    status: StatusCode,
    retry_after_ms: Option<u64>,
    body: &str,
) -> ProviderError {
    let detail = format!("HTTP {}: {}", status.as_u16(), truncate(body.trim()));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::auth(platform, detail),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(platform, retry_after_ms),
        _ => ProviderError::api(platform, detail),
    }
}

/// Send a request, check its status and decode the JSON body.
pub async fn send_json<T: serde::de::DeserializeOwned>(
    platform: Platform,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let resp = request
        .send()
        .await
        .map_err(|e| classify_transport(platform, &e))?;
    let resp = check_status(platform, resp).await?;
    resp.json::<T>()
        .await
        .map_err(|e| ProviderError::decode(platform, e))
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderValue, RETRY_AFTER};

    use {super::*, crate::error::ProviderErrorKind};

    #[test]
    fn retry_after_seconds_become_millis() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after_ms_from_headers(&headers), Some(7_000));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after_ms_from_headers(&headers), None);
    }

    #[test]
    fn status_classification() {
        let p = Platform::Gmail;
        assert!(matches!(
            classify_status(p, StatusCode::UNAUTHORIZED, None, "").cause,
            ProviderErrorKind::Auth(_)
        ));
        assert!(matches!(
            classify_status(p, StatusCode::FORBIDDEN, None, "").cause,
            ProviderErrorKind::Auth(_)
        ));
        assert_eq!(
            classify_status(p, StatusCode::TOO_MANY_REQUESTS, Some(2000), "").cause,
            ProviderErrorKind::RateLimited {
                retry_after_ms: Some(2000)
            }
        );
        assert!(matches!(
            classify_status(p, StatusCode::BAD_GATEWAY, None, "upstream").cause,
            ProviderErrorKind::Api(ref m) if m.contains("502") && m.contains("upstream")
        ));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let err = classify_status(Platform::Slack, StatusCode::BAD_REQUEST, None, &body);
        assert!(err.to_string().len() < 300);
    }
}
