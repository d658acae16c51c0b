//! Convenience result type alias for ProfileHub.

use crate::error::AppError;

/// A specialized `Result` type for ProfileHub operations.
pub type AppResult<T> = Result<T, AppError>;
