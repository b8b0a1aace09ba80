//! Send pipeline metrics
//!
//! Recorded through the `metrics` facade; installing a recorder is left to
//! the embedding application.

use metrics::{counter, describe_counter};

pub const RTP_PACKETS_SENT: &str = "rtp_packets_sent_total";
pub const RTP_BYTES_SENT: &str = "rtp_bytes_sent_total";
pub const RTP_FRAMES_DROPPED: &str = "rtp_frames_dropped_total";
pub const PAYLOAD_BUFFER_GROWTHS: &str = "payload_buffer_growths_total";

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(RTP_PACKETS_SENT, "Total number of RTP packets handed to the transport");
    describe_counter!(RTP_BYTES_SENT, "Total number of protected RTP bytes sent");
    describe_counter!(
        RTP_FRAMES_DROPPED,
        "Frames dropped before packetization, by reason"
    );
    describe_counter!(
        PAYLOAD_BUFFER_GROWTHS,
        "Number of payload buffer reallocations"
    );
}

pub(crate) fn record_packet_sent(bytes: usize) {
    counter!(RTP_PACKETS_SENT).increment(1);
    counter!(RTP_BYTES_SENT).increment(bytes as u64);
}

pub(crate) fn record_frame_dropped(reason: &'static str) {
    counter!(RTP_FRAMES_DROPPED, "reason" => reason).increment(1);
}

pub(crate) fn record_buffer_growth() {
    counter!(PAYLOAD_BUFFER_GROWTHS).increment(1);
}
