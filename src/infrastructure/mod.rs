//! Infrastructure layer - Technical implementations
//!
//! Payloaders, RTP and SRTP codecs, transports and the transceiver
//! pipeline built on top of them.

pub mod media;
