//! RTP payloadization
//!
//! A [`Payloader`] splits one encoded frame into payload chunks that each fit
//! in a single RTP packet. Payloaders are driven twice per frame:
//!
//! 1. **measure** - no output buffers, only the total byte length and the
//!    number of chunks are computed
//! 2. **fill** - the chunks are written back to back into a byte buffer and
//!    their lengths into a length table
//!
//! Both passes go through the same [`Payloader::write_chunks`] so the sizes
//! reported by the first pass always match what the second pass writes.

pub mod g711;
pub mod h264;
pub mod opus;
pub mod pool;
pub mod registry;
pub mod vp8;

pub use g711::G711Payloader;
pub use h264::H264Payloader;
pub use opus::OpusPayloader;
pub use pool::PayloadBuffers;
pub use registry::{PayloaderEntry, PayloaderRegistry};
pub use vp8::Vp8Payloader;

use bytes::Bytes;

/// Sizes produced by one payloadization pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayloadSize {
    /// Sum of all chunk lengths in bytes
    pub total_len: usize,
    /// Number of chunks, which is also the number of RTP packets
    pub chunk_count: usize,
}

/// Payloader errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("Empty frame")]
    EmptyFrame,
    #[error("Invalid max payload size: {0}")]
    InvalidMaxPayloadSize(usize),
    #[error("Output buffer too small: need {needed} bytes and {chunks} chunks")]
    BufferTooSmall { needed: usize, chunks: usize },
    #[error("Inconsistent chunk table: {0}")]
    InconsistentChunks(String),
    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// Sink for payload chunks.
///
/// In measuring mode it only counts; in filling mode it copies into the
/// caller's buffers and fails once they are exhausted.
pub struct ChunkWriter<'a> {
    target: Option<(&'a mut [u8], &'a mut [u32])>,
    total_len: usize,
    chunk_count: usize,
}

impl<'a> ChunkWriter<'a> {
    pub fn measuring() -> Self {
        Self {
            target: None,
            total_len: 0,
            chunk_count: 0,
        }
    }

    pub fn filling(payload: &'a mut [u8], lengths: &'a mut [u32]) -> Self {
        Self {
            target: Some((payload, lengths)),
            total_len: 0,
            chunk_count: 0,
        }
    }

    pub fn is_measuring(&self) -> bool {
        self.target.is_none()
    }

    /// Emit one chunk made of `parts` laid out back to back
    pub fn push(&mut self, parts: &[&[u8]]) -> Result<(), PayloadError> {
        let chunk_len: usize = parts.iter().map(|p| p.len()).sum();
        let needed = self.total_len + chunk_len;

        if let Some((payload, lengths)) = self.target.as_mut() {
            if needed > payload.len() || self.chunk_count >= lengths.len() {
                return Err(PayloadError::BufferTooSmall {
                    needed,
                    chunks: self.chunk_count + 1,
                });
            }

            let mut offset = self.total_len;
            for part in parts {
                payload[offset..offset + part.len()].copy_from_slice(part);
                offset += part.len();
            }
            lengths[self.chunk_count] = chunk_len as u32;
        }

        self.total_len = needed;
        self.chunk_count += 1;
        Ok(())
    }

    pub fn finish(self) -> PayloadSize {
        PayloadSize {
            total_len: self.total_len,
            chunk_count: self.chunk_count,
        }
    }
}

/// Codec-specific fragmentation strategy
pub trait Payloader: Send + Sync {
    /// Emit the chunks for `frame`, none larger than `max_payload_size`
    /// unless the payload format says otherwise
    fn write_chunks(
        &self,
        max_payload_size: usize,
        frame: &[u8],
        writer: &mut ChunkWriter<'_>,
    ) -> Result<(), PayloadError>;

    /// Rebuild an encoded frame from the payloads of its packets, in order
    fn depayload(&self, chunks: &[Bytes]) -> Result<Bytes, PayloadError>;

    /// First pass: required byte length and chunk count
    fn measure(&self, max_payload_size: usize, frame: &[u8]) -> Result<PayloadSize, PayloadError> {
        let mut writer = ChunkWriter::measuring();
        self.write_chunks(max_payload_size, frame, &mut writer)?;
        Ok(writer.finish())
    }

    /// Second pass: write chunks into `payload` and their lengths into `lengths`
    fn fill(
        &self,
        max_payload_size: usize,
        frame: &[u8],
        payload: &mut [u8],
        lengths: &mut [u32],
    ) -> Result<PayloadSize, PayloadError> {
        let mut writer = ChunkWriter::filling(payload, lengths);
        self.write_chunks(max_payload_size, frame, &mut writer)?;
        Ok(writer.finish())
    }
}

/// Shared argument checks for the built-in payloaders
pub(crate) fn check_input(max_payload_size: usize, frame: &[u8]) -> Result<(), PayloadError> {
    if max_payload_size == 0 {
        return Err(PayloadError::InvalidMaxPayloadSize(max_payload_size));
    }
    if frame.is_empty() {
        return Err(PayloadError::EmptyFrame);
    }
    Ok(())
}

/// Concatenate chunk payloads unchanged
pub(crate) fn concat_chunks(chunks: &[Bytes]) -> Bytes {
    if chunks.len() == 1 {
        return chunks[0].clone();
    }
    let total: usize = chunks.iter().map(|c| c.len()).sum();
    let mut out = Vec::with_capacity(total);
    for chunk in chunks {
        out.extend_from_slice(chunk);
    }
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measuring_writer_counts_only() {
        let mut writer = ChunkWriter::measuring();
        writer.push(&[b"abc"]).unwrap();
        writer.push(&[b"de", b"f"]).unwrap();
        assert!(writer.is_measuring());
        assert_eq!(
            writer.finish(),
            PayloadSize {
                total_len: 6,
                chunk_count: 2
            }
        );
    }

    #[test]
    fn test_filling_writer_lays_out_chunks() {
        let mut payload = [0u8; 8];
        let mut lengths = [0u32; 2];
        let mut writer = ChunkWriter::filling(&mut payload, &mut lengths);
        writer.push(&[&[0x10], b"xyz"]).unwrap();
        writer.push(&[b"ab"]).unwrap();
        let size = writer.finish();

        assert_eq!(size.total_len, 6);
        assert_eq!(&payload[..6], &[0x10, b'x', b'y', b'z', b'a', b'b']);
        assert_eq!(lengths, [4, 2]);
    }

    #[test]
    fn test_filling_writer_rejects_overflow() {
        let mut payload = [0u8; 4];
        let mut lengths = [0u32; 4];
        let mut writer = ChunkWriter::filling(&mut payload, &mut lengths);
        writer.push(&[b"abc"]).unwrap();
        assert_eq!(
            writer.push(&[b"de"]),
            Err(PayloadError::BufferTooSmall {
                needed: 5,
                chunks: 2
            })
        );

        let mut payload = [0u8; 16];
        let mut lengths = [0u32; 1];
        let mut writer = ChunkWriter::filling(&mut payload, &mut lengths);
        writer.push(&[b"a"]).unwrap();
        assert!(writer.push(&[b"b"]).is_err());
    }
}
