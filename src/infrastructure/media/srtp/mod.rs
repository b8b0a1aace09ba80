//! SRTP (Secure Real-time Transport Protocol), RFC 3711
//!
//! The send pipeline only sees [`RtpProtector`]; [`SrtpContext`] is the
//! AES-CM / HMAC-SHA1 implementation installed once keys are negotiated.

pub mod context;
pub mod crypto;

pub use context::SrtpContext;
pub use crypto::{SrtpMasterKey, SrtpProfile, SrtpSessionKeys};

/// SRTP error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SrtpError {
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Replay detected for packet index {0}")]
    ReplayDetected(u64),

    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Protected packet grew by {grew} bytes, limit is {limit}")]
    TagOverflow { grew: usize, limit: usize },

    #[error("Crypto error: {0}")]
    Crypto(String),
}

/// Encrypts outgoing RTP packets in place
///
/// Implementations may append an authentication tag; callers serialize
/// packets with enough spare capacity for it.
#[cfg_attr(test, mockall::automock)]
pub trait RtpProtector: Send {
    fn protect_rtp(&mut self, packet: &mut Vec<u8>) -> Result<(), SrtpError>;
}
