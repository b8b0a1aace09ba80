//! RTP (Real-time Transport Protocol), RFC 3550

pub mod builder;
pub mod jitter_buffer;
pub mod packet;

pub use builder::construct_rtp_packets;
pub use jitter_buffer::{AssembledFrame, JitterBuffer, JitterBufferConfig, JitterBufferStats};
pub use packet::{RtpError, RtpPacket};
