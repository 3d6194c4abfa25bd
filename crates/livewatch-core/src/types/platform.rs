//! Supported streaming platforms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A streaming platform a subject can be linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Twitch.
    Twitch,
    /// YouTube.
    YouTube,
}

impl Platform {
    /// All known platforms, in display order.
    pub const ALL: [Platform; 2] = [Platform::Twitch, Platform::YouTube];

    /// Return the platform as a lowercase key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitch => "twitch",
            Self::YouTube => "youtube",
        }
    }

    /// Human-readable platform name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Twitch => "Twitch",
            Self::YouTube => "YouTube",
        }
    }

    /// Public URL where the channel's live stream can be watched.
    pub fn channel_url(&self, handle: &str) -> String {
        match self {
            Self::Twitch => format!("https://twitch.tv/{handle}"),
            Self::YouTube => format!("https://www.youtube.com/channel/{handle}/live"),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "twitch" => Ok(Self::Twitch),
            "youtube" | "yt" => Ok(Self::YouTube),
            _ => Err(AppError::validation(format!("Unknown platform: '{s}'"))),
        }
    }
}
