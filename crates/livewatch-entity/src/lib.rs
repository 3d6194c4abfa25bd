//! # livewatch-entity
//!
//! Domain entities for LiveWatch: communities, subjects and their platform
//! links, per-link presence state, intents, and the versioned durable
//! document that ties them together.

pub mod community;
pub mod document;
pub mod intent;
pub mod presence;
pub mod subject;

pub use community::{CommunityConfig, CommunityRecord, CommunitySnapshot};
pub use document::{DocumentMetadata, SCHEMA_VERSION, StateDocument};
pub use intent::{Intent, IntentKind};
pub use presence::PresenceState;
pub use subject::{PlatformLink, SubjectRecord};
