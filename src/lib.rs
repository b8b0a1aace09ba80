//! rtc-transceiver - per-frame RTP send pipeline for WebRTC transceivers
//!
//! Frames are split by a codec payloader into RTP packets, encrypted with
//! the connection's SRTP context and handed to a packet transport. The
//! receive side reorders packets in a jitter buffer and reassembles frames.

pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use domain::media::{Codec, Frame, MediaKind, MediaStreamTrack, TransceiverDirection};
pub use domain::shared::error::MediaError;
pub use domain::shared::result::Result;
pub use infrastructure::media::{
    DropReason, PacketTransport, PeerConnection, RtpProtector, SendOutcome, Transceiver,
};
