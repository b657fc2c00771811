//! Convenience result type alias for ChatVibe.

use crate::error::AppError;

/// A specialized `Result` type for ChatVibe operations.
pub type AppResult<T> = Result<T, AppError>;
