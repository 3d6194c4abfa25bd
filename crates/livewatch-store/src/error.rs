//! State store error taxonomy.

use std::path::Path;

use thiserror::Error;

use livewatch_core::error::{AppError, ErrorKind};
use livewatch_core::types::{CommunityId, MemberId, Platform};

/// Errors raised by the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The durable document could not be decoded.
    #[error("state document '{path}' is corrupt: {reason}")]
    Corruption {
        /// Where the bad document came from.
        path: String,
        /// Decoder message.
        reason: String,
    },

    /// Reading or writing durable storage failed.
    #[error("storage I/O error on '{path}': {source}")]
    Io {
        /// File or directory involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding the in-memory model failed.
    #[error("failed to encode state document: {0}")]
    Encode(#[from] serde_json::Error),

    /// No such community.
    #[error("community {0} not found")]
    CommunityNotFound(CommunityId),

    /// No such (subject, platform) link.
    #[error("member {member} has no {platform} link in community {community}")]
    LinkNotFound {
        /// Community searched.
        community: CommunityId,
        /// Member searched.
        member: MemberId,
        /// Platform searched.
        platform: Platform,
    },

    /// The operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid input from the command layer.
    #[error("invalid input: {0}")]
    Validation(String),
}

impl StoreError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Build a corruption error.
    pub fn corruption(origin: impl Into<String>, reason: impl ToString) -> Self {
        Self::Corruption {
            path: origin.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let kind = match &err {
            StoreError::Corruption { .. } => ErrorKind::Corruption,
            StoreError::Io { .. } => ErrorKind::Storage,
            StoreError::Encode(_) => ErrorKind::Serialization,
            StoreError::CommunityNotFound(_) | StoreError::LinkNotFound { .. } => {
                ErrorKind::NotFound
            }
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Validation(_) => ErrorKind::Validation,
        };
        let message = err.to_string();
        AppError::with_source(kind, message, err)
    }
}
