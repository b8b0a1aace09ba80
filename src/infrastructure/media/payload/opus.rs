//! Opus payloader (RFC 7587)
//!
//! An Opus packet is never fragmented: the whole encoded frame is the RTP
//! payload.

use super::{check_input, concat_chunks, ChunkWriter, PayloadError, Payloader};
use bytes::Bytes;

#[derive(Debug, Clone, Copy, Default)]
pub struct OpusPayloader;

impl Payloader for OpusPayloader {
    fn write_chunks(
        &self,
        max_payload_size: usize,
        frame: &[u8],
        writer: &mut ChunkWriter<'_>,
    ) -> Result<(), PayloadError> {
        check_input(max_payload_size, frame)?;
        writer.push(&[frame])
    }

    fn depayload(&self, chunks: &[Bytes]) -> Result<Bytes, PayloadError> {
        if chunks.is_empty() {
            return Err(PayloadError::Malformed("no Opus payload".to_string()));
        }
        Ok(concat_chunks(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::media::payload::PayloadSize;

    #[test]
    fn test_single_chunk() {
        let frame = vec![0xFC; 120];
        assert_eq!(
            OpusPayloader.measure(1300, &frame).unwrap(),
            PayloadSize {
                total_len: 120,
                chunk_count: 1
            }
        );
    }

    #[test]
    fn test_large_frames_are_not_split() {
        let frame = vec![0xFC; 2000];
        assert_eq!(OpusPayloader.measure(1300, &frame).unwrap().chunk_count, 1);
    }

    #[test]
    fn test_depayload() {
        let chunk = Bytes::from_static(&[0xFC, 0x01]);
        assert_eq!(OpusPayloader.depayload(&[chunk.clone()]).unwrap(), chunk);
        assert!(OpusPayloader.depayload(&[]).is_err());
    }
}
