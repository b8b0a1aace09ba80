//! Codec identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// RTP clock rate for all video codecs (RFC 3551)
pub const VIDEO_CLOCK_RATE: u32 = 90_000;
/// RTP clock rate mandated for Opus (RFC 7587)
pub const OPUS_CLOCK_RATE: u32 = 48_000;
/// RTP clock rate for G.711
pub const PCM_CLOCK_RATE: u32 = 8_000;

/// Media kind carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Codecs a transceiver can be negotiated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Codec {
    /// H.264 constrained baseline, packetization-mode=1
    H264,
    Opus,
    /// G.711 µ-law (PCMU)
    Mulaw,
    /// G.711 A-law (PCMA)
    Alaw,
    Vp8,
    /// Negotiable, but no payloader ships for it
    H265,
}

impl Codec {
    pub fn media_kind(&self) -> MediaKind {
        match self {
            Self::H264 | Self::Vp8 | Self::H265 => MediaKind::Video,
            Self::Opus | Self::Mulaw | Self::Alaw => MediaKind::Audio,
        }
    }

    /// Payload type used until negotiation assigns another one
    pub fn default_payload_type(&self) -> u8 {
        match self {
            Self::Mulaw => 0,
            Self::Alaw => 8,
            Self::Vp8 => 96,
            Self::Opus => 111,
            Self::H264 => 125,
            Self::H265 => 127,
        }
    }

    /// Encoding name for rtpmap
    pub fn name(&self) -> &'static str {
        match self {
            Self::H264 => "H264",
            Self::Opus => "opus",
            Self::Mulaw => "PCMU",
            Self::Alaw => "PCMA",
            Self::Vp8 => "VP8",
            Self::H265 => "H265",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
