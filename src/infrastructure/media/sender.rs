//! Per-frame RTP send pipeline

use super::metrics;
use super::payload::PayloadError;
use super::rtp::construct_rtp_packets;
use super::srtp::SrtpError;
use super::transceiver::Transceiver;
use crate::domain::media::{convert_timestamp_to_rtp, Frame};
use crate::domain::shared::{MediaError, Result};
use tracing::{debug, trace};

/// Result of a successful `send_frame`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Every packet of the frame reached the transport
    Sent { packets: usize, bytes: usize },
    /// The frame was discarded without sending anything
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The connection has no encryption context yet
    NotReady,
    /// The transceiver does not send
    Direction,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotReady => "not_ready",
            Self::Direction => "direction",
        }
    }
}

impl SendOutcome {
    pub fn packets(&self) -> usize {
        match self {
            Self::Sent { packets, .. } => *packets,
            Self::Dropped(_) => 0,
        }
    }
}

impl Transceiver {
    /// Packetize, encrypt and transmit one frame.
    ///
    /// The connection's encryption lock is held from the readiness check
    /// until the last packet is handed to the transport. Without an
    /// encryption context the frame is dropped and `Ok(Dropped(NotReady))`
    /// is returned. A failure while sending aborts the remaining packets;
    /// packets already sent stay sent and the sequence counter stays
    /// advanced past the whole frame.
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<SendOutcome> {
        if frame.is_empty() {
            return Err(MediaError::invalid_argument("frame has no data"));
        }
        if !self.direction.can_send() {
            return Ok(self.drop_frame(DropReason::Direction));
        }

        let shared = self.connection.upgrade().ok_or(MediaError::ConnectionClosed)?;
        let mut guard = shared.protector.lock().await;
        let Some(protector) = guard.as_mut() else {
            return Ok(self.drop_frame(DropReason::NotReady));
        };

        let entry = shared.payloaders.resolve(self.track.codec)?;
        let max_payload_size = shared.config.max_payload_size;
        let timestamp = convert_timestamp_to_rtp(entry.clock_rate, frame.presentation_ts);

        // Measure, grow if needed, then fill in place
        let required = entry.payloader.measure(max_payload_size, &frame.data)?;
        if required.chunk_count == 0 {
            return Err(PayloadError::Malformed(format!(
                "{} payloader produced no chunks for a {} byte frame",
                self.track.codec,
                frame.len()
            ))
            .into());
        }
        if self.buffers.reserve(required)? {
            metrics::record_buffer_growth();
            debug!(
                "ssrc={:08x} payload buffers grown to {} bytes / {} chunks",
                self.ssrc,
                self.buffers.payload_capacity(),
                self.buffers.chunk_capacity()
            );
        }
        let (payload, lengths) = self.buffers.fill_target();
        let filled = entry.payloader.fill(max_payload_size, &frame.data, payload, lengths)?;
        if filled != required {
            return Err(PayloadError::InconsistentChunks(format!(
                "measured {:?} but filled {:?}",
                required, filled
            ))
            .into());
        }
        self.buffers.commit(filled)?;

        let packets = construct_rtp_packets(
            self.buffers.chunks(),
            self.payload_type,
            self.sequence_number,
            timestamp,
            self.ssrc,
        );
        self.sequence_number = self.sequence_number.wrapping_add(packets.len() as u16);

        let margin = shared.config.auth_tag_margin;
        let mut bytes = 0;
        for packet in &packets {
            let mut wire = packet.to_wire(margin);
            let plain_len = wire.len();

            protector.protect_rtp(&mut wire)?;
            if wire.len() > plain_len + margin {
                return Err(SrtpError::TagOverflow {
                    grew: wire.len() - plain_len,
                    limit: margin,
                }
                .into());
            }

            shared.transport.send_packet(&wire).await?;
            trace!("Sent {} ({} bytes on the wire)", packet, wire.len());

            bytes += wire.len();
            self.stats.packets_sent += 1;
            self.stats.bytes_sent += wire.len() as u64;
            metrics::record_packet_sent(wire.len());
        }

        self.stats.frames_sent += 1;
        debug!(
            "ssrc={:08x} sent frame pts={} ts={} as {} packets, next seq={}",
            self.ssrc,
            frame.presentation_ts,
            timestamp,
            packets.len(),
            self.sequence_number
        );

        Ok(SendOutcome::Sent {
            packets: packets.len(),
            bytes,
        })
    }

    fn drop_frame(&mut self, reason: DropReason) -> SendOutcome {
        self.stats.frames_dropped += 1;
        metrics::record_frame_dropped(reason.as_str());
        debug!("ssrc={:08x} dropped frame: {:?}", self.ssrc, reason);
        SendOutcome::Dropped(reason)
    }
}
