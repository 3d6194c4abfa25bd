//! Twitch Helix adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, trace};

use livewatch_core::config::TwitchConfig;
use livewatch_core::error::AppError;
use livewatch_core::result::AppResult;
use livewatch_core::traits::{AdapterError, PlatformAdapter};
use livewatch_core::types::{LiveStatus, Platform};

use crate::http::{build_client, classify_status, map_request_error};
use crate::token_cache::{AccessToken, TokenCache};

const TOKEN_KEY: &str = "twitch";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    #[serde(default)]
    data: Vec<StreamEntry>,
}

#[derive(Debug, Deserialize)]
struct StreamEntry {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    title: Option<String>,
}

/// Checks channels through `GET /helix/streams` with an app access token
/// obtained by the client-credentials grant.
#[derive(Debug, Clone)]
pub struct TwitchAdapter {
    client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    api_base: String,
    tokens: TokenCache,
}

impl TwitchAdapter {
    /// Create the adapter from configuration.
    pub fn new(config: &TwitchConfig, timeout: Duration) -> AppResult<Self> {
        if config.client_id.trim().is_empty() || config.client_secret.trim().is_empty() {
            return Err(AppError::configuration(
                "platforms.twitch.client_id and client_secret are required",
            ));
        }

        Ok(Self {
            client: build_client(timeout)?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            tokens: TokenCache::default(),
        })
    }

    async fn fetch_token(&self) -> Result<AccessToken, AdapterError> {
        let response = self
            .client
            .post(&self.token_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status.is_client_error() && status.as_u16() != 429 {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Unauthorized(format!(
                "token request rejected ({status}): {body}"
            )));
        }
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &headers, &body));
        }

        let token: TokenResponse = response.json().await.map_err(map_request_error)?;
        debug!(expires_in = token.expires_in, "Obtained Twitch app access token");
        Ok(AccessToken {
            value: token.access_token,
            expires_in: Duration::from_secs(token.expires_in),
        })
    }

    async fn query_stream(&self, handle: &str) -> Result<LiveStatus, AdapterError> {
        let token = self
            .tokens
            .get_or_fetch(TOKEN_KEY, || self.fetch_token())
            .await?;

        let response = self
            .client
            .get(format!("{}/streams", self.api_base))
            .query(&[("user_login", handle)])
            .header("Client-Id", &self.client_id)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &headers, &body));
        }

        let body = response.text().await.map_err(map_request_error)?;
        parse_streams(&body)
    }
}

/// Decode a Helix streams response.
pub fn parse_streams(body: &str) -> Result<LiveStatus, AdapterError> {
    let parsed: StreamsResponse = serde_json::from_str(body)
        .map_err(|e| AdapterError::InvalidResponse(format!("twitch streams: {e}")))?;

    let status = parsed
        .data
        .into_iter()
        .find(|entry| entry.kind == "live")
        .map(|entry| LiveStatus::live(entry.title))
        .unwrap_or_else(LiveStatus::offline);
    Ok(status)
}

#[async_trait]
impl PlatformAdapter for TwitchAdapter {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    async fn check_live(&self, handle: &str) -> Result<LiveStatus, AdapterError> {
        let status = self
            .tokens
            .retry_on_auth_expiry(TOKEN_KEY, || self.query_stream(handle))
            .await?;
        trace!(handle, is_live = status.is_live, "Twitch check complete");
        Ok(status)
    }
}
