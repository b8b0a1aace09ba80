//! Media result type

use super::error::MediaError;

/// Standard result type for media operations
pub type Result<T> = std::result::Result<T, MediaError>;
