//! Newtype wrappers around chat-platform snowflake identifiers.
//!
//! Using distinct types prevents accidentally passing a `RoleId` where a
//! `ChannelId` is expected. All ids serialize as plain integers, and as
//! strings when used as JSON object keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Macro to define a newtype ID wrapper around a `u64` snowflake.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create an identifier from a raw snowflake.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the raw snowflake value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a community (a chat server / guild).
    CommunityId
);

define_id!(
    /// Identifier of a community member.
    MemberId
);

define_id!(
    /// Identifier of a role within a community.
    RoleId
);

define_id!(
    /// Identifier of a text channel.
    ChannelId
);
