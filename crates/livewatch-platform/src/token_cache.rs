//! Bearer token memoization.

use std::future::Future;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use tracing::{debug, warn};

use livewatch_core::traits::AdapterError;

/// Token returned by an OAuth endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Bearer value.
    pub value: String,
    /// Lifetime reported by the issuer.
    pub expires_in: Duration,
}

/// Evicts each token `margin` before the issuer says it expires.
#[derive(Debug, Clone, Copy)]
struct TokenExpiry {
    margin: Duration,
}

impl Expiry<String, AccessToken> for TokenExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &AccessToken,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.expires_in.saturating_sub(self.margin))
    }
}

/// Caches tokens per key and coalesces concurrent refreshes, so concurrent
/// checks never trigger more than one token request.
#[derive(Debug, Clone)]
pub struct TokenCache {
    cache: Cache<String, AccessToken>,
}

impl TokenCache {
    /// Default safety margin before expiry.
    pub const DEFAULT_MARGIN: Duration = Duration::from_secs(60);

    /// Create a cache that evicts tokens `margin` early.
    pub fn new(margin: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .expire_after(TokenExpiry { margin })
            .build();
        Self { cache }
    }

    /// Cached token for `key`, fetching one if absent or expired.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<String, AdapterError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, AdapterError>>,
    {
        let token = self
            .cache
            .try_get_with(key.to_string(), async {
                debug!(key, "Fetching new access token");
                fetch().await
            })
            .await
            .map_err(|e| (*e).clone())?;
        Ok(token.value)
    }

    /// Drop the cached token for `key`.
    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Run `op`; on [`AdapterError::AuthExpired`] drop the token and run it
    /// exactly once more.
    pub async fn retry_on_auth_expiry<T, F, Fut>(
        &self,
        key: &str,
        mut op: F,
    ) -> Result<T, AdapterError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AdapterError>>,
    {
        match op().await {
            Err(AdapterError::AuthExpired(reason)) => {
                warn!(key, reason = %reason, "Access token rejected, refreshing once");
                self.invalidate(key).await;
                op().await
            }
            other => other,
        }
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MARGIN)
    }
}
