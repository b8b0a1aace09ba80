//! Domain layer - media types independent of wire formats
//!
//! This layer contains:
//! - Codec identifiers and their clock rates
//! - Media frames as handed over by encoders
//! - Track descriptors and transceiver directions

pub mod media;
pub mod shared;
