//! Streaming platform credentials.

use serde::{Deserialize, Serialize};

/// Credentials and tuning for all streaming platform adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformsConfig {
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Twitch Helix settings.
    #[serde(default)]
    pub twitch: TwitchConfig,
    /// YouTube Data API settings.
    #[serde(default)]
    pub youtube: YouTubeConfig,
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            twitch: TwitchConfig::default(),
            youtube: YouTubeConfig::default(),
        }
    }
}

/// Twitch Helix API configuration (client-credentials flow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchConfig {
    /// Whether the Twitch adapter is registered.
    #[serde(default)]
    pub enabled: bool,
    /// Application client ID.
    #[serde(default)]
    pub client_id: String,
    /// Application client secret.
    #[serde(default)]
    pub client_secret: String,
    /// OAuth token endpoint.
    #[serde(default = "default_twitch_token_url")]
    pub token_url: String,
    /// Helix API base URL.
    #[serde(default = "default_twitch_api_base")]
    pub api_base: String,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: String::new(),
            client_secret: String::new(),
            token_url: default_twitch_token_url(),
            api_base: default_twitch_api_base(),
        }
    }
}

/// YouTube Data API v3 configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    /// Whether the YouTube adapter is registered.
    #[serde(default)]
    pub enabled: bool,
    /// API key.
    #[serde(default)]
    pub api_key: String,
    /// Data API base URL.
    #[serde(default = "default_youtube_api_base")]
    pub api_base: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            api_base: default_youtube_api_base(),
        }
    }
}

fn default_request_timeout() -> u64 {
    10
}

fn default_twitch_token_url() -> String {
    "https://id.twitch.tv/oauth2/token".to_string()
}

fn default_twitch_api_base() -> String {
    "https://api.twitch.tv/helix".to_string()
}

fn default_youtube_api_base() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}
