//! Media transport implementations

pub mod connection;
pub mod metrics;
pub mod payload;
pub mod rtp;
pub mod sender;
pub mod srtp;
pub mod transceiver;
pub mod transport;

pub use connection::PeerConnection;
pub use payload::{Payloader, PayloaderEntry, PayloaderRegistry, PayloadBuffers, PayloadError, PayloadSize};
pub use rtp::{
    construct_rtp_packets, AssembledFrame, JitterBuffer, JitterBufferConfig, JitterBufferStats,
    RtpError, RtpPacket,
};
pub use sender::{DropReason, SendOutcome};
pub use srtp::{RtpProtector, SrtpContext, SrtpError, SrtpMasterKey, SrtpProfile};
pub use transceiver::{FrameCallback, SenderStats, Transceiver};
pub use transport::{PacketTransport, TransportError, UdpTransport};
