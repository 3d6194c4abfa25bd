//! Shared HTTP helpers for platform adapters.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};

use livewatch_core::error::{AppError, ErrorKind};
use livewatch_core::result::AppResult;
use livewatch_core::traits::AdapterError;

/// Build an HTTP client with the configured request timeout.
pub fn build_client(timeout: Duration) -> AppResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("livewatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
        })
}

/// Map a transport-level failure.
pub fn map_request_error(err: reqwest::Error) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout
    } else if err.is_decode() {
        AdapterError::InvalidResponse(err.to_string())
    } else {
        AdapterError::Network(err.to_string())
    }
}

/// Map a non-success HTTP status.
pub fn classify_status(status: StatusCode, headers: &HeaderMap, body: &str) -> AdapterError {
    match status {
        StatusCode::UNAUTHORIZED => AdapterError::AuthExpired(truncate(body)),
        StatusCode::FORBIDDEN => AdapterError::Unauthorized(truncate(body)),
        StatusCode::TOO_MANY_REQUESTS => AdapterError::RateLimited {
            retry_after_secs: retry_after(headers),
        },
        s if s.is_server_error() => AdapterError::Network(format!("server returned {s}")),
        s => AdapterError::InvalidResponse(format!("unexpected status {s}: {}", truncate(body))),
    }
}

/// Seconds from a `Retry-After` header, when given as an integer.
pub fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_classify_status() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));

        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, &headers, ""),
            AdapterError::RateLimited {
                retry_after_secs: Some(30)
            }
        );
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, &HeaderMap::new(), "expired"),
            AdapterError::AuthExpired(_)
        ));
        assert!(
            classify_status(StatusCode::BAD_GATEWAY, &HeaderMap::new(), "").is_retryable()
        );
        assert!(
            !classify_status(StatusCode::NOT_FOUND, &HeaderMap::new(), "").is_retryable()
        );
    }
}
