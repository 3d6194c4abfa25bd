//! Streaming platform adapter trait.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{AppError, ErrorKind};
use crate::types::{LiveStatus, Platform};

/// Failure of a single live check. Every variant is non-fatal for the
/// polling cycle; the subject keeps its previous state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Transport-level failure (connect, DNS, 5xx).
    #[error("network error: {0}")]
    Network(String),

    /// The call did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The bearer token was rejected; a refreshed token may succeed.
    #[error("authorization expired: {0}")]
    AuthExpired(String),

    /// Credentials are invalid or missing.
    #[error("authorization failed: {0}")]
    Unauthorized(String),

    /// The platform throttled the caller.
    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited {
        /// Server-suggested wait, if provided.
        retry_after_secs: Option<u64>,
    },

    /// The platform answered with something we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// No adapter is registered for the requested platform.
    #[error("no adapter registered for platform '{0}'")]
    Unsupported(Platform),
}

impl AdapterError {
    /// Whether retrying the same call within the current cycle may help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout | Self::RateLimited { .. }
        )
    }
}

impl From<AdapterError> for AppError {
    fn from(err: AdapterError) -> Self {
        let message = err.to_string();
        AppError::with_source(ErrorKind::Adapter, message, err)
    }
}

/// Uniform live-check capability, one implementation per platform.
///
/// Implementations must be safe to call concurrently for distinct handles,
/// must cache any bearer token internally, and must retry once on an
/// authorization-expiry response before surfacing an error.
#[async_trait]
pub trait PlatformAdapter: Send + Sync + std::fmt::Debug + 'static {
    /// The platform this adapter serves.
    fn platform(&self) -> Platform;

    /// Report whether the channel identified by `handle` is live.
    async fn check_live(&self, handle: &str) -> Result<LiveStatus, AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AdapterError::Timeout.is_retryable());
        assert!(AdapterError::Network("reset".into()).is_retryable());
        assert!(
            AdapterError::RateLimited {
                retry_after_secs: Some(3)
            }
            .is_retryable()
        );
        assert!(!AdapterError::AuthExpired("401".into()).is_retryable());
        assert!(!AdapterError::Unsupported(Platform::Twitch).is_retryable());
    }
}
