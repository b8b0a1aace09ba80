//! Transceiver lifecycle and receive path

use super::connection::{ConnectionShared, PeerConnection};
use super::payload::PayloadBuffers;
use super::rtp::{JitterBuffer, RtpPacket};
use crate::domain::media::{convert_rtp_to_timestamp, Codec, Frame, MediaStreamTrack};
use crate::domain::media::TransceiverDirection;
use crate::domain::shared::{MediaError, Result};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Invoked with every frame reassembled on the receive path
pub type FrameCallback = Arc<dyn Fn(&Frame) + Send + Sync>;

/// Send-side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub frames_sent: u64,
    pub frames_dropped: u64,
}

/// Transceiver
///
/// One send stream and one receive stream for a negotiated media line.
/// `send_frame` takes `&mut self`, so sends on one transceiver are
/// serialized by the borrow checker; sends on different transceivers of
/// the same connection are serialized by the connection's encryption lock.
pub struct Transceiver {
    pub(super) direction: TransceiverDirection,
    pub(super) ssrc: u32,
    pub(super) track: MediaStreamTrack,
    pub(super) payload_type: u8,
    pub(super) sequence_number: u16,
    pub(super) buffers: PayloadBuffers,
    pub(super) connection: Weak<ConnectionShared>,
    pub(super) stats: SenderStats,
    receive_codec: Codec,
    jitter_buffer: Option<JitterBuffer>,
    on_frame: Option<FrameCallback>,
}

impl Transceiver {
    /// Create a transceiver on `connection`.
    ///
    /// The send buffers are allocated here with the connection's initial
    /// capacities; an allocation failure yields `OutOfMemory` with nothing
    /// left allocated.
    pub fn new(
        direction: TransceiverDirection,
        connection: &PeerConnection,
        ssrc: u32,
        track: MediaStreamTrack,
        jitter_buffer: Option<JitterBuffer>,
        receive_codec: Codec,
    ) -> Result<Self> {
        track.validate().map_err(MediaError::InvalidArgument)?;

        let config = connection.config();
        let buffers = PayloadBuffers::with_capacity(
            config.initial_payload_capacity,
            config.initial_chunk_capacity,
        )?;

        info!(
            "Created {:?} transceiver ssrc={:08x} codec={} track={}",
            direction, ssrc, track.codec, track.track_id
        );

        Ok(Self {
            direction,
            ssrc,
            payload_type: track.codec.default_payload_type(),
            track,
            sequence_number: rand::random(),
            buffers,
            connection: connection.downgrade(),
            stats: SenderStats::default(),
            receive_codec,
            jitter_buffer,
            on_frame: None,
        })
    }

    /// Release the transceiver held in `handle`, leaving `None` behind.
    ///
    /// Calling it again on the emptied handle is a no-op.
    pub fn destroy(handle: &mut Option<Transceiver>) {
        if let Some(transceiver) = handle.take() {
            transceiver.close();
        }
    }

    pub fn close(self) {
        info!(
            "Closed transceiver ssrc={:08x} after {} packets",
            self.ssrc, self.stats.packets_sent
        );
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn direction(&self) -> TransceiverDirection {
        self.direction
    }

    pub fn track(&self) -> &MediaStreamTrack {
        &self.track
    }

    pub fn codec(&self) -> Codec {
        self.track.codec
    }

    pub fn receive_codec(&self) -> Codec {
        self.receive_codec
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    /// Override the negotiated payload type
    pub fn set_payload_type(&mut self, payload_type: u8) -> Result<()> {
        if payload_type > 0x7F {
            return Err(MediaError::invalid_argument(format!(
                "payload type {} does not fit in 7 bits",
                payload_type
            )));
        }
        self.payload_type = payload_type;
        Ok(())
    }

    /// Sequence number the next packet will carry
    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    pub fn set_sequence_number(&mut self, sequence_number: u16) {
        self.sequence_number = sequence_number;
    }

    pub fn sender_stats(&self) -> SenderStats {
        self.stats
    }

    pub fn payload_buffers(&self) -> &PayloadBuffers {
        &self.buffers
    }

    pub fn jitter_buffer(&self) -> Option<&JitterBuffer> {
        self.jitter_buffer.as_ref()
    }

    /// Attach a jitter buffer, handing back the one it replaces
    pub fn set_jitter_buffer(&mut self, jitter_buffer: JitterBuffer) -> Option<JitterBuffer> {
        self.jitter_buffer.replace(jitter_buffer)
    }

    pub fn take_jitter_buffer(&mut self) -> Option<JitterBuffer> {
        self.jitter_buffer.take()
    }

    /// Register the frame-ready callback, replacing any previous one
    pub fn on_frame<F>(&mut self, callback: F)
    where
        F: Fn(&Frame) + Send + Sync + 'static,
    {
        self.on_frame = Some(Arc::new(callback));
    }

    pub fn has_frame_callback(&self) -> bool {
        self.on_frame.is_some()
    }

    /// Feed one received packet through the jitter buffer.
    ///
    /// Every frame this packet makes releasable is depayloaded and passed to
    /// the frame callback. Returns the number of frames delivered.
    pub fn receive_rtp_packet(&mut self, packet: RtpPacket) -> Result<usize> {
        if !self.direction.can_receive() {
            debug!(
                "Ignoring packet seq={} on {:?} transceiver",
                packet.sequence, self.direction
            );
            return Ok(0);
        }

        self.attached_jitter_buffer()?.add_packet(packet);
        self.poll_frames()
    }

    /// Deliver frames whose hold time has run out since the last packet.
    ///
    /// Receive loops call this on a timer so that the last frame of a burst
    /// is released without waiting for another packet.
    pub fn poll_frames(&mut self) -> Result<usize> {
        if !self.direction.can_receive() {
            return Ok(0);
        }

        let shared = self.connection.upgrade().ok_or(MediaError::ConnectionClosed)?;
        let entry = shared.payloaders.resolve(self.receive_codec)?;
        let jitter_buffer = self
            .jitter_buffer
            .as_mut()
            .ok_or_else(|| MediaError::invalid_argument("no jitter buffer attached"))?;

        let mut delivered = 0;
        while let Some(assembled) = jitter_buffer.pop_frame() {
            let data = match entry.payloader.depayload(&assembled.payloads) {
                Ok(data) => data,
                Err(e) => {
                    warn!(
                        "Dropping frame ts={} starting at seq={}: {}",
                        assembled.timestamp, assembled.first_sequence, e
                    );
                    continue;
                }
            };

            let frame = Frame::new(
                convert_rtp_to_timestamp(entry.clock_rate, assembled.timestamp),
                data,
            );
            if let Some(callback) = &self.on_frame {
                callback(&frame);
            }
            delivered += 1;
        }

        Ok(delivered)
    }

    fn attached_jitter_buffer(&mut self) -> Result<&mut JitterBuffer> {
        self.jitter_buffer
            .as_mut()
            .ok_or_else(|| MediaError::invalid_argument("no jitter buffer attached"))
    }

    /// Parse a plain RTP datagram and feed it to [`receive_rtp_packet`](Self::receive_rtp_packet)
    pub fn receive_rtp_bytes(&mut self, data: &[u8]) -> Result<usize> {
        let packet = RtpPacket::parse(data)?;
        self.receive_rtp_packet(packet)
    }
}

impl fmt::Debug for Transceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transceiver")
            .field("direction", &self.direction)
            .field("ssrc", &self.ssrc)
            .field("track", &self.track)
            .field("payload_type", &self.payload_type)
            .field("sequence_number", &self.sequence_number)
            .field("receive_codec", &self.receive_codec)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
