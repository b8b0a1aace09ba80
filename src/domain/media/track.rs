//! Media track descriptors

use super::codec::{Codec, MediaKind};
use serde::{Deserialize, Serialize};

/// Transceiver direction, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransceiverDirection {
    SendOnly,
    RecvOnly,
    SendRecv,
    Inactive,
}

impl TransceiverDirection {
    pub fn can_send(&self) -> bool {
        matches!(self, Self::SendOnly | Self::SendRecv)
    }

    pub fn can_receive(&self) -> bool {
        matches!(self, Self::RecvOnly | Self::SendRecv)
    }
}

/// Describes the local track a transceiver sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStreamTrack {
    /// Track identifier (msid track id)
    pub track_id: String,
    /// Stream identifier (msid stream id)
    pub stream_id: String,
    pub kind: MediaKind,
    /// Codec frames on this track are encoded with
    pub codec: Codec,
}

impl MediaStreamTrack {
    pub fn new(track_id: impl Into<String>, stream_id: impl Into<String>, codec: Codec) -> Self {
        Self {
            track_id: track_id.into(),
            stream_id: stream_id.into(),
            kind: codec.media_kind(),
            codec,
        }
    }

    /// Check that the descriptor is usable for a transceiver
    pub fn validate(&self) -> Result<(), String> {
        if self.track_id.is_empty() {
            return Err("track id must not be empty".to_string());
        }
        if self.kind != self.codec.media_kind() {
            return Err(format!(
                "track kind {:?} does not match codec {}",
                self.kind, self.codec
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_capabilities() {
        assert!(TransceiverDirection::SendOnly.can_send());
        assert!(!TransceiverDirection::SendOnly.can_receive());
        assert!(TransceiverDirection::SendRecv.can_send());
        assert!(TransceiverDirection::SendRecv.can_receive());
        assert!(!TransceiverDirection::Inactive.can_send());
        assert!(!TransceiverDirection::RecvOnly.can_send());
    }

    #[test]
    fn test_track_validation() {
        let track = MediaStreamTrack::new("video0", "stream0", Codec::H264);
        assert!(track.validate().is_ok());

        let unnamed = MediaStreamTrack::new("", "stream0", Codec::H264);
        assert!(unnamed.validate().is_err());

        let mut mismatched = MediaStreamTrack::new("audio0", "stream0", Codec::Opus);
        mismatched.kind = MediaKind::Video;
        assert!(mismatched.validate().is_err());
    }
}
