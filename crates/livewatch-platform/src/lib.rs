//! # livewatch-platform
//!
//! Streaming platform adapters. Each adapter answers one question for one
//! channel handle: is it live right now, and with what title. Bearer tokens
//! are cached until shortly before they expire and refreshed once on an
//! auth-expiry response.

pub mod http;
pub mod registry;
pub mod token_cache;
pub mod twitch;
pub mod youtube;

pub use registry::AdapterRegistry;
pub use token_cache::{AccessToken, TokenCache};
pub use twitch::TwitchAdapter;
pub use youtube::YouTubeAdapter;
