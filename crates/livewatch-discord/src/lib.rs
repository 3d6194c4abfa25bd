//! # livewatch-discord
//!
//! Discord REST v10 implementation of
//! [`ChatPlatformClient`](livewatch_core::traits::ChatPlatformClient):
//! channel messages for live notifications and member role updates for the
//! live role.

pub mod client;
pub mod formatter;

pub use client::DiscordClient;
pub use formatter::render_announcement;
