//! Convenience result type alias for LiveWatch.

use crate::error::AppError;

/// A specialized `Result` type for LiveWatch operations.
pub type AppResult<T> = Result<T, AppError>;
