//! Shared value types: typed identifiers, platforms, and live status.

pub mod id;
pub mod live;
pub mod platform;

pub use id::{ChannelId, CommunityId, MemberId, RoleId};
pub use live::LiveStatus;
pub use platform::Platform;
