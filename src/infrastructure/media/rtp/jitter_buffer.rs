//! Jitter Buffer Implementation
//!
//! Reorders received packets and groups them back into frames

use super::packet::RtpPacket;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Jitter Buffer Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterBufferConfig {
    /// Minimum time a packet is held before its frame may be released
    pub min_delay_ms: u32,
    /// Time after which missing packets are given up on
    pub max_delay_ms: u32,
    /// Maximum buffer size in packets
    pub max_packets: usize,
}

impl Default for JitterBufferConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 20,
            max_delay_ms: 200,
            max_packets: 512,
        }
    }
}

/// Buffered packet with arrival time
#[derive(Debug, Clone)]
struct BufferedPacket {
    packet: RtpPacket,
    arrival_time: Instant,
}

/// Payloads of one complete frame, in sequence order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledFrame {
    pub timestamp: u32,
    pub first_sequence: u16,
    pub payloads: Vec<Bytes>,
}

/// Jitter Buffer
///
/// Packets are kept sorted by sequence number. A frame is released once the
/// run of packets starting at the next expected sequence number is gap-free
/// and closed by a marker bit or by the first packet of the next timestamp.
#[derive(Debug)]
pub struct JitterBuffer {
    config: JitterBufferConfig,
    buffer: VecDeque<BufferedPacket>,
    next_sequence: Option<u16>,
    packets_received: u64,
    packets_dropped: u64,
    packets_late: u64,
    frames_assembled: u64,
    frames_lost: u64,
}

impl JitterBuffer {
    pub fn new(config: JitterBufferConfig) -> Self {
        let max_packets = config.max_packets;
        Self {
            config,
            buffer: VecDeque::with_capacity(max_packets),
            next_sequence: None,
            packets_received: 0,
            packets_dropped: 0,
            packets_late: 0,
            frames_assembled: 0,
            frames_lost: 0,
        }
    }

    pub fn config(&self) -> &JitterBufferConfig {
        &self.config
    }

    /// Add packet to buffer
    pub fn add_packet(&mut self, packet: RtpPacket) {
        self.add_packet_at(packet, Instant::now());
    }

    fn add_packet_at(&mut self, packet: RtpPacket, now: Instant) {
        self.packets_received += 1;
        let seq = packet.sequence;

        if let Some(expected) = self.next_sequence {
            if sequence_less_than(seq, expected) {
                debug!("Late packet: expected={}, got={}", expected, seq);
                self.packets_late += 1;
                return;
            }
        }

        if self.buffer.iter().any(|p| p.packet.sequence == seq) {
            debug!("Duplicate packet seq={}", seq);
            self.packets_dropped += 1;
            return;
        }

        if self.buffer.len() >= self.config.max_packets {
            warn!("Jitter buffer full, dropping oldest packet");
            self.buffer.pop_front();
            self.packets_dropped += 1;
        }

        // Insert in sequence order
        let insert_pos = self
            .buffer
            .iter()
            .position(|p| sequence_less_than(seq, p.packet.sequence))
            .unwrap_or(self.buffer.len());

        self.buffer.insert(
            insert_pos,
            BufferedPacket {
                packet,
                arrival_time: now,
            },
        );

        debug!(
            "Buffered packet seq={}, buffer_size={}",
            seq,
            self.buffer.len()
        );
    }

    /// Release the next complete frame, if any
    pub fn pop_frame(&mut self) -> Option<AssembledFrame> {
        self.pop_frame_at(Instant::now())
    }

    fn pop_frame_at(&mut self, now: Instant) -> Option<AssembledFrame> {
        let min_delay = Duration::from_millis(self.config.min_delay_ms as u64);
        let max_delay = Duration::from_millis(self.config.max_delay_ms as u64);

        loop {
            let front = self.buffer.front()?;
            let age = now.saturating_duration_since(front.arrival_time);
            if age < min_delay {
                return None;
            }

            let expected = *self.next_sequence.get_or_insert(front.packet.sequence);
            let actual = front.packet.sequence;

            if actual != expected {
                if age < max_delay {
                    return None;
                }
                // Too old, assume packets lost and skip to this one
                warn!("Skipping lost packets: {} to {}", expected, actual);
                self.next_sequence = Some(actual);
                continue;
            }

            match self.frame_len(expected) {
                Some(len) => return Some(self.take_frame(expected, len)),
                None if age >= max_delay => {
                    let len = self.contiguous_len(expected);
                    warn!(
                        "Dropping incomplete frame ts={} ({} packets)",
                        front.packet.timestamp, len
                    );
                    self.buffer.drain(..len);
                    self.next_sequence = Some(expected.wrapping_add(len as u16));
                    self.frames_lost += 1;
                }
                None => return None,
            }
        }
    }

    /// Packet count of the complete frame at the head, if it is complete
    fn frame_len(&self, expected: u16) -> Option<usize> {
        let timestamp = self.buffer.front()?.packet.timestamp;

        for (i, buffered) in self.buffer.iter().enumerate() {
            if buffered.packet.sequence != expected.wrapping_add(i as u16) {
                return None;
            }
            if buffered.packet.timestamp != timestamp {
                return Some(i);
            }
            if buffered.packet.marker {
                return Some(i + 1);
            }
        }

        None
    }

    /// Gap-free packets at the head sharing the head's timestamp
    fn contiguous_len(&self, expected: u16) -> usize {
        let Some(front) = self.buffer.front() else {
            return 0;
        };
        let timestamp = front.packet.timestamp;

        self.buffer
            .iter()
            .enumerate()
            .take_while(|(i, p)| {
                p.packet.sequence == expected.wrapping_add(*i as u16)
                    && p.packet.timestamp == timestamp
            })
            .count()
    }

    fn take_frame(&mut self, first_sequence: u16, len: usize) -> AssembledFrame {
        let mut timestamp = 0;
        let payloads = self
            .buffer
            .drain(..len)
            .map(|buffered| {
                timestamp = buffered.packet.timestamp;
                buffered.packet.payload
            })
            .collect();

        self.next_sequence = Some(first_sequence.wrapping_add(len as u16));
        self.frames_assembled += 1;

        AssembledFrame {
            timestamp,
            first_sequence,
            payloads,
        }
    }

    /// Get buffer statistics
    pub fn stats(&self) -> JitterBufferStats {
        JitterBufferStats {
            buffer_size: self.buffer.len(),
            packets_received: self.packets_received,
            packets_dropped: self.packets_dropped,
            packets_late: self.packets_late,
            frames_assembled: self.frames_assembled,
            frames_lost: self.frames_lost,
        }
    }

    /// Clear buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.next_sequence = None;
    }
}

/// Check if a < b considering wraparound
fn sequence_less_than(a: u16, b: u16) -> bool {
    a != b && b.wrapping_sub(a) < 0x8000
}

/// Jitter Buffer Statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JitterBufferStats {
    pub buffer_size: usize,
    pub packets_received: u64,
    pub packets_dropped: u64,
    pub packets_late: u64,
    pub frames_assembled: u64,
    pub frames_lost: u64,
}
