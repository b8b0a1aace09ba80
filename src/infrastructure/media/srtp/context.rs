//! Per-direction SRTP context

use super::crypto::{apply_keystream, auth_tag, packet_iv, verify_auth_tag};
use super::crypto::{SrtpMasterKey, SrtpProfile, SrtpSessionKeys};
use super::{RtpProtector, SrtpError};
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// Replay protection using sliding window
#[derive(Debug, Default)]
struct ReplayWindow {
    /// Highest packet index accepted
    highest: u64,
    /// Bit n set means `highest - n` was accepted
    window: u64,
}

impl ReplayWindow {
    const SIZE: u64 = 64;

    /// Check if packet should be accepted (not a replay)
    fn check(&self, index: u64) -> bool {
        if index > self.highest || self.window == 0 {
            return true;
        }
        let diff = self.highest - index;
        diff < Self::SIZE && self.window & (1 << diff) == 0
    }

    fn update(&mut self, index: u64) {
        if self.window == 0 || index > self.highest {
            let shift = index.saturating_sub(self.highest);
            self.window = if self.window == 0 || shift >= Self::SIZE {
                1
            } else {
                (self.window << shift) | 1
            };
            self.highest = index;
        } else {
            self.window |= 1 << (self.highest - index);
        }
    }
}

/// Rollover state for one SSRC
#[derive(Debug, Default)]
struct StreamState {
    roc: u32,
    last_seq: u16,
    initialized: bool,
    replay: ReplayWindow,
}

impl StreamState {
    /// Advance the sender's rollover counter for an outgoing sequence number
    fn next_send_index(&mut self, seq: u16) -> (u32, u64) {
        if self.initialized && seq < self.last_seq && self.last_seq - seq > 0x8000 {
            self.roc = self.roc.wrapping_add(1);
        }
        self.last_seq = seq;
        self.initialized = true;
        (self.roc, index_of(self.roc, seq))
    }

    /// Receiver ROC guess from RFC 3711 section 3.3.1
    fn estimate_roc(&self, seq: u16) -> u32 {
        if !self.initialized {
            return self.roc;
        }
        let (s_l, seq) = (self.last_seq as i32, seq as i32);
        if s_l < 0x8000 {
            if seq - s_l > 0x8000 {
                return self.roc.wrapping_sub(1);
            }
        } else if s_l - 0x8000 > seq {
            return self.roc.wrapping_add(1);
        }
        self.roc
    }

    fn accept(&mut self, roc: u32, seq: u16) {
        let index = index_of(roc, seq);
        if !self.initialized || index > index_of(self.roc, self.last_seq) {
            self.roc = roc;
            self.last_seq = seq;
            self.initialized = true;
        }
        self.replay.update(index);
    }
}

fn index_of(roc: u32, seq: u16) -> u64 {
    ((roc as u64) << 16) | seq as u64
}

/// SRTP context for one direction of a session
///
/// Encrypts the payload with AES-CM and appends an HMAC-SHA1 tag computed
/// over the header, the ciphertext and the rollover counter.
pub struct SrtpContext {
    profile: SrtpProfile,
    keys: SrtpSessionKeys,
    streams: HashMap<u32, StreamState>,
    replay_protection: bool,
}

impl SrtpContext {
    pub fn new(master_key: &SrtpMasterKey, profile: SrtpProfile) -> Self {
        Self {
            profile,
            keys: SrtpSessionKeys::derive(master_key),
            streams: HashMap::new(),
            replay_protection: true,
        }
    }

    pub fn profile(&self) -> SrtpProfile {
        self.profile
    }

    /// Bytes appended to every protected packet
    pub fn overhead(&self) -> usize {
        self.profile.auth_tag_len()
    }

    pub fn disable_replay_protection(&mut self) {
        self.replay_protection = false;
    }

    /// Encrypt and authenticate an RTP packet in place
    pub fn protect_rtp(&mut self, packet: &mut Vec<u8>) -> Result<(), SrtpError> {
        let header = RtpHeaderInfo::parse(packet)?;
        let stream = self.streams.entry(header.ssrc).or_default();
        let (roc, index) = stream.next_send_index(header.sequence);

        let iv = packet_iv(&self.keys.salt, header.ssrc, index);
        apply_keystream(&self.keys.cipher_key, &iv, &mut packet[header.len..]);

        let tag = auth_tag(&self.keys.auth_key, packet, roc, self.profile.auth_tag_len())?;
        packet.extend_from_slice(&tag);
        Ok(())
    }

    /// Verify and decrypt an SRTP packet in place, removing the tag
    pub fn unprotect_rtp(&mut self, packet: &mut Vec<u8>) -> Result<(), SrtpError> {
        let tag_len = self.profile.auth_tag_len();
        if packet.len() < tag_len + 12 {
            return Err(SrtpError::InvalidPacket("packet too short".to_string()));
        }
        let authenticated_len = packet.len() - tag_len;
        let header = RtpHeaderInfo::parse(&packet[..authenticated_len])?;

        // Streams are only tracked once a packet for them authenticates
        let known = self.streams.get(&header.ssrc);
        let roc = known.map_or(0, |stream| stream.estimate_roc(header.sequence));
        let index = index_of(roc, header.sequence);

        if self.replay_protection && known.is_some_and(|stream| !stream.replay.check(index)) {
            trace!("SRTP replay rejected: ssrc={:#010x} index={}", header.ssrc, index);
            return Err(SrtpError::ReplayDetected(index));
        }

        let (authenticated, tag) = packet.split_at(authenticated_len);
        if !verify_auth_tag(&self.keys.auth_key, authenticated, roc, tag)? {
            return Err(SrtpError::AuthenticationFailed);
        }

        self.streams
            .entry(header.ssrc)
            .or_default()
            .accept(roc, header.sequence);
        packet.truncate(authenticated_len);

        let iv = packet_iv(&self.keys.salt, header.ssrc, index);
        apply_keystream(&self.keys.cipher_key, &iv, &mut packet[header.len..]);
        Ok(())
    }
}

impl RtpProtector for SrtpContext {
    fn protect_rtp(&mut self, packet: &mut Vec<u8>) -> Result<(), SrtpError> {
        SrtpContext::protect_rtp(self, packet)
    }
}

impl fmt::Debug for SrtpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SrtpContext")
            .field("profile", &self.profile)
            .field("streams", &self.streams.len())
            .field("replay_protection", &self.replay_protection)
            .finish_non_exhaustive()
    }
}

/// Header fields SRTP needs
struct RtpHeaderInfo {
    ssrc: u32,
    sequence: u16,
    /// Header length including CSRCs and extension
    len: usize,
}

impl RtpHeaderInfo {
    fn parse(packet: &[u8]) -> Result<Self, SrtpError> {
        if packet.len() < 12 {
            return Err(SrtpError::InvalidPacket("packet too short".to_string()));
        }
        let version = packet[0] >> 6;
        if version != 2 {
            return Err(SrtpError::InvalidPacket(format!(
                "invalid RTP version: {}",
                version
            )));
        }

        let mut len = 12 + (packet[0] & 0x0F) as usize * 4;
        if packet[0] & 0x10 != 0 {
            if packet.len() < len + 4 {
                return Err(SrtpError::InvalidPacket(
                    "extension header too short".to_string(),
                ));
            }
            let words = u16::from_be_bytes([packet[len + 2], packet[len + 3]]) as usize;
            len += 4 + words * 4;
        }
        if packet.len() < len {
            return Err(SrtpError::InvalidPacket("truncated header".to_string()));
        }

        Ok(Self {
            ssrc: u32::from_be_bytes([packet[8], packet[9], packet[10], packet[11]]),
            sequence: u16::from_be_bytes([packet[2], packet[3]]),
            len,
        })
    }
}
