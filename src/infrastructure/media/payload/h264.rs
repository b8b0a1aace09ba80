//! H.264 payloader (RFC 6184, packetization-mode=1)
//!
//! Input frames are Annex B byte streams. Every NAL unit that fits in
//! `max_payload_size` is sent as a Single NAL Unit packet; larger units are
//! split into FU-A fragments:
//!
//! ```text
//!  FU indicator     FU header
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |F|NRI|  Type   |S|E|R|  Type   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use super::{check_input, ChunkWriter, PayloadError, Payloader};
use bytes::Bytes;

const STAP_A_TYPE: u8 = 24;
const FU_A_TYPE: u8 = 28;
const FU_HEADER_SIZE: usize = 2;
const FU_START_BIT: u8 = 0x80;
const FU_END_BIT: u8 = 0x40;
const NAL_TYPE_MASK: u8 = 0x1F;
const NAL_F_NRI_MASK: u8 = 0xE0;
const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

#[derive(Debug, Clone, Copy, Default)]
pub struct H264Payloader;

impl Payloader for H264Payloader {
    fn write_chunks(
        &self,
        max_payload_size: usize,
        frame: &[u8],
        writer: &mut ChunkWriter<'_>,
    ) -> Result<(), PayloadError> {
        check_input(max_payload_size, frame)?;

        let mut nal_count = 0;
        for nal in NalUnits::new(frame) {
            nal_count += 1;
            if nal.len() <= max_payload_size {
                writer.push(&[nal])?;
                continue;
            }

            if max_payload_size <= FU_HEADER_SIZE {
                return Err(PayloadError::InvalidMaxPayloadSize(max_payload_size));
            }

            let fu_indicator = (nal[0] & NAL_F_NRI_MASK) | FU_A_TYPE;
            let nal_type = nal[0] & NAL_TYPE_MASK;
            let fragments = nal[1..].chunks(max_payload_size - FU_HEADER_SIZE);
            let last = fragments.len() - 1;

            for (i, fragment) in fragments.enumerate() {
                let mut fu_header = nal_type;
                if i == 0 {
                    fu_header |= FU_START_BIT;
                }
                if i == last {
                    fu_header |= FU_END_BIT;
                }
                writer.push(&[&[fu_indicator, fu_header], fragment])?;
            }
        }

        if nal_count == 0 {
            return Err(PayloadError::Malformed(
                "Annex B stream contains no NAL units".to_string(),
            ));
        }
        Ok(())
    }

    fn depayload(&self, chunks: &[Bytes]) -> Result<Bytes, PayloadError> {
        let mut out = Vec::with_capacity(chunks.iter().map(|c| c.len() + START_CODE.len()).sum());

        for chunk in chunks {
            if chunk.is_empty() {
                return Err(PayloadError::Malformed("empty H.264 payload".to_string()));
            }

            match chunk[0] & NAL_TYPE_MASK {
                1..=23 => {
                    out.extend_from_slice(&START_CODE);
                    out.extend_from_slice(chunk);
                }
                STAP_A_TYPE => {
                    let mut rest = &chunk[1..];
                    while rest.len() >= 2 {
                        let size = u16::from_be_bytes([rest[0], rest[1]]) as usize;
                        rest = &rest[2..];
                        if size == 0 || size > rest.len() {
                            return Err(PayloadError::Malformed(
                                "STAP-A unit exceeds packet".to_string(),
                            ));
                        }
                        out.extend_from_slice(&START_CODE);
                        out.extend_from_slice(&rest[..size]);
                        rest = &rest[size..];
                    }
                }
                FU_A_TYPE => {
                    if chunk.len() < FU_HEADER_SIZE {
                        return Err(PayloadError::Malformed("truncated FU-A header".to_string()));
                    }
                    let fu_header = chunk[1];
                    if fu_header & FU_START_BIT != 0 {
                        out.extend_from_slice(&START_CODE);
                        out.push((chunk[0] & NAL_F_NRI_MASK) | (fu_header & NAL_TYPE_MASK));
                    }
                    out.extend_from_slice(&chunk[FU_HEADER_SIZE..]);
                }
                other => {
                    return Err(PayloadError::Malformed(format!(
                        "unsupported NAL unit type {}",
                        other
                    )));
                }
            }
        }

        Ok(Bytes::from(out))
    }
}

/// Iterator over the NAL units of an Annex B stream, start codes stripped.
///
/// A stream without any start code is treated as a single NAL unit. Bytes
/// ahead of the first start code form a NAL unit of their own unless they
/// are zero padding.
struct NalUnits<'a> {
    data: &'a [u8],
    pos: Option<usize>,
    started: bool,
}

impl<'a> NalUnits<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: None,
            started: false,
        }
    }
}

impl<'a> Iterator for NalUnits<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if !self.started {
            self.started = true;
            if find_start_code(self.data, 0).is_none() {
                // Raw NAL unit without framing
                return Some(self.data).filter(|d| !is_zero_padding(d));
            }
            self.pos = Some(0);
        }

        loop {
            let start = self.pos?;
            if start >= self.data.len() {
                self.pos = None;
                return None;
            }

            let nal = match find_start_code(self.data, start) {
                Some((at, len)) => {
                    self.pos = Some(at + len);
                    &self.data[start..at]
                }
                None => {
                    self.pos = None;
                    &self.data[start..]
                }
            };

            if !is_zero_padding(nal) {
                return Some(nal);
            }
        }
    }
}

/// Empty or all-zero runs never carry a NAL header
fn is_zero_padding(data: &[u8]) -> bool {
    data.iter().all(|b| *b == 0)
}

/// Position and length of the next 3- or 4-byte start code at or after `from`
fn find_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            if i > from && data[i - 1] == 0 {
                return Some((i - 1, 4));
            }
            return Some((i, 3));
        }
        i += 1;
    }
    None
}
