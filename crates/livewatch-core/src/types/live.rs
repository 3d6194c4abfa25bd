//! Result of a single live check.

use serde::{Deserialize, Serialize};

/// What a platform adapter reports for one channel handle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiveStatus {
    /// Whether the channel is currently broadcasting.
    pub is_live: bool,
    /// Stream title, when live and reported by the platform.
    pub title: Option<String>,
}

impl LiveStatus {
    /// An offline observation.
    pub fn offline() -> Self {
        Self {
            is_live: false,
            title: None,
        }
    }

    /// A live observation with an optional title.
    pub fn live(title: Option<String>) -> Self {
        Self {
            is_live: true,
            title: title.filter(|t| !t.trim().is_empty()),
        }
    }
}
