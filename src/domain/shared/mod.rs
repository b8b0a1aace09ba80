//! Shared kernel - error taxonomy used by every media component

pub mod error;
pub mod result;

pub use error::MediaError;
pub use result::Result;
