//! YouTube Data API adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::trace;

use livewatch_core::config::YouTubeConfig;
use livewatch_core::error::AppError;
use livewatch_core::result::AppResult;
use livewatch_core::traits::{AdapterError, PlatformAdapter};
use livewatch_core::types::{LiveStatus, Platform};

use crate::http::{build_client, classify_status, map_request_error};

/// Error reasons YouTube uses for quota exhaustion.
const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "rateLimitExceeded",
    "dailyLimitExceeded",
    "userRateLimitExceeded",
];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    live_broadcast_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Checks channels by searching for a live broadcast owned by the channel id.
#[derive(Debug, Clone)]
pub struct YouTubeAdapter {
    client: Client,
    api_key: String,
    api_base: String,
}

impl YouTubeAdapter {
    /// Create the adapter from configuration.
    pub fn new(config: &YouTubeConfig, timeout: Duration) -> AppResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::configuration(
                "platforms.youtube.api_key is required",
            ));
        }

        Ok(Self {
            client: build_client(timeout)?,
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

/// Decode a search response. Any item still flagged `live` means the channel
/// is broadcasting.
pub fn parse_search(body: &str) -> Result<LiveStatus, AdapterError> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| AdapterError::InvalidResponse(format!("youtube search: {e}")))?;

    let status = parsed
        .items
        .into_iter()
        .filter_map(|item| item.snippet)
        .find(|snippet| snippet.live_broadcast_content.as_deref() == Some("live"))
        .map(|snippet| LiveStatus::live(snippet.title))
        .unwrap_or_else(LiveStatus::offline);
    Ok(status)
}

/// Whether a 403 body reports quota exhaustion rather than a bad key.
pub fn is_quota_error(body: &str) -> bool {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| {
            envelope
                .error
                .errors
                .iter()
                .any(|detail| QUOTA_REASONS.contains(&detail.reason.as_str()))
        })
        .unwrap_or(false)
}

#[async_trait]
impl PlatformAdapter for YouTubeAdapter {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn check_live(&self, handle: &str) -> Result<LiveStatus, AdapterError> {
        let response = self
            .client
            .get(format!("{}/search", self.api_base))
            .query(&[
                ("part", "snippet"),
                ("channelId", handle),
                ("eventType", "live"),
                ("type", "video"),
                ("maxResults", "1"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::FORBIDDEN && is_quota_error(&body) {
                return Err(AdapterError::RateLimited {
                    retry_after_secs: None,
                });
            }
            // API keys do not expire, so a 401 is a credential problem.
            if status == StatusCode::UNAUTHORIZED {
                return Err(AdapterError::Unauthorized(body));
            }
            return Err(classify_status(status, &headers, &body));
        }

        let body = response.text().await.map_err(map_request_error)?;
        let live = parse_search(&body)?;
        trace!(handle, is_live = live.is_live, "YouTube check complete");
        Ok(live)
    }
}
