//! RTP Packet Implementation (RFC 3550)

use bytes::{Buf, BufMut, Bytes};
use std::fmt;

/// RTP Packet Structure
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       sequence number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |           synchronization source (SSRC) identifier            |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// |            contributing source (CSRC) identifiers             |
/// |                             ....                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The sender never emits padding, CSRCs or header extensions; they are
/// accepted (and skipped) when parsing received packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    /// Marker bit, set on the last packet of a frame
    pub marker: bool,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    /// Contributing source identifiers
    pub csrc: Vec<u32>,
    pub payload: Bytes,
}

impl RtpPacket {
    /// Fixed header size (without CSRC or extension)
    pub const HEADER_SIZE: usize = 12;
    pub const VERSION: u8 = 2;

    pub fn new(payload_type: u8, sequence: u16, timestamp: u32, ssrc: u32, payload: Bytes) -> Self {
        Self {
            marker: false,
            payload_type,
            sequence,
            timestamp,
            ssrc,
            csrc: Vec::new(),
            payload,
        }
    }

    pub fn with_marker(mut self, marker: bool) -> Self {
        self.marker = marker;
        self
    }

    /// Parse RTP packet from bytes
    pub fn parse(data: &[u8]) -> Result<Self, RtpError> {
        if data.len() < Self::HEADER_SIZE {
            return Err(RtpError::PacketTooShort);
        }

        let mut buf = data;

        // Byte 0: V(2), P(1), X(1), CC(4)
        let byte0 = buf.get_u8();
        let version = byte0 >> 6;
        if version != Self::VERSION {
            return Err(RtpError::InvalidVersion(version));
        }
        let padding = byte0 & 0x20 != 0;
        let extension = byte0 & 0x10 != 0;
        let csrc_count = (byte0 & 0x0F) as usize;

        // Byte 1: M(1), PT(7)
        let byte1 = buf.get_u8();
        let marker = byte1 & 0x80 != 0;
        let payload_type = byte1 & 0x7F;

        let sequence = buf.get_u16();
        let timestamp = buf.get_u32();
        let ssrc = buf.get_u32();

        if buf.remaining() < csrc_count * 4 {
            return Err(RtpError::PacketTooShort);
        }
        let csrc = (0..csrc_count).map(|_| buf.get_u32()).collect();

        if extension {
            if buf.remaining() < 4 {
                return Err(RtpError::PacketTooShort);
            }
            let _profile = buf.get_u16();
            let length = buf.get_u16() as usize * 4;
            if buf.remaining() < length {
                return Err(RtpError::PacketTooShort);
            }
            buf.advance(length);
        }

        let mut payload_len = buf.remaining();
        if padding {
            let padding_len = *buf.last().ok_or(RtpError::InvalidPadding)? as usize;
            if padding_len == 0 || padding_len > payload_len {
                return Err(RtpError::InvalidPadding);
            }
            payload_len -= padding_len;
        }

        Ok(Self {
            marker,
            payload_type,
            sequence,
            timestamp,
            ssrc,
            csrc,
            payload: Bytes::copy_from_slice(&buf[..payload_len]),
        })
    }

    /// Size of the serialized packet
    pub fn wire_len(&self) -> usize {
        Self::HEADER_SIZE + self.csrc.len() * 4 + self.payload.len()
    }

    /// Append the wire form of this packet to `buf`
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.reserve(self.wire_len());

        let csrc_count = self.csrc.len().min(15) as u8;
        buf.put_u8((Self::VERSION << 6) | csrc_count);
        buf.put_u8(((self.marker as u8) << 7) | (self.payload_type & 0x7F));
        buf.put_u16(self.sequence);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);
        for csrc in self.csrc.iter().take(15) {
            buf.put_u32(*csrc);
        }
        buf.put_slice(&self.payload);
    }

    /// Serialize into a fresh buffer with `headroom` spare bytes of capacity,
    /// so an authentication tag can be appended without reallocating
    pub fn to_wire(&self, headroom: usize) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_len() + headroom);
        self.write_to(&mut buf);
        buf
    }

    pub fn serialize(&self) -> Bytes {
        Bytes::from(self.to_wire(0))
    }
}

impl fmt::Display for RtpPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RTP[PT={}, Seq={}, TS={}, SSRC={:08x}, Marker={}, Payload={}]",
            self.payload_type,
            self.sequence,
            self.timestamp,
            self.ssrc,
            self.marker,
            self.payload.len()
        )
    }
}

/// RTP errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RtpError {
    #[error("Packet too short")]
    PacketTooShort,
    #[error("Invalid version: {0}")]
    InvalidVersion(u8),
    #[error("Invalid padding")]
    InvalidPadding,
}
