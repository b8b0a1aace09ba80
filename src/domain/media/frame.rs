//! Encoded media frames

use bytes::Bytes;

/// Hundred-nanosecond units per second, the unit of frame timestamps
pub const HUNDREDS_OF_NANOS_IN_A_SECOND: u64 = 10_000_000;

/// One encoded frame as produced by an encoder or reassembled by the receive path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Presentation timestamp in hundred-nanosecond units
    pub presentation_ts: u64,
    /// Decoding timestamp in hundred-nanosecond units
    pub decoding_ts: u64,
    /// Key frame flag (video only)
    pub key_frame: bool,
    /// Encoded bytes
    pub data: Bytes,
}

impl Frame {
    pub fn new(presentation_ts: u64, data: impl Into<Bytes>) -> Self {
        Self {
            presentation_ts,
            decoding_ts: presentation_ts,
            key_frame: false,
            data: data.into(),
        }
    }

    pub fn key_frame(mut self) -> Self {
        self.key_frame = true;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Convert a hundred-ns presentation timestamp into RTP clock units.
///
/// Exact integer floor division; the product is widened so it never overflows.
/// The result wraps into 32 bits like every RTP timestamp.
pub fn convert_timestamp_to_rtp(clock_rate: u32, presentation_ts: u64) -> u32 {
    let ticks =
        (presentation_ts as u128 * clock_rate as u128) / HUNDREDS_OF_NANOS_IN_A_SECOND as u128;
    ticks as u32
}

/// Reverse of [`convert_timestamp_to_rtp`] for frames assembled on the receive path
pub fn convert_rtp_to_timestamp(clock_rate: u32, rtp_timestamp: u32) -> u64 {
    if clock_rate == 0 {
        return 0;
    }
    (rtp_timestamp as u64 * HUNDREDS_OF_NANOS_IN_A_SECOND) / clock_rate as u64
}
