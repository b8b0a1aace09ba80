//! G.711 payloader (RFC 3551)
//!
//! Samples are one byte each, so a frame is simply cut into runs of
//! `max_payload_size` bytes. Used for both µ-law and A-law.

use super::{check_input, concat_chunks, ChunkWriter, PayloadError, Payloader};
use bytes::Bytes;

#[derive(Debug, Clone, Copy, Default)]
pub struct G711Payloader;

impl Payloader for G711Payloader {
    fn write_chunks(
        &self,
        max_payload_size: usize,
        frame: &[u8],
        writer: &mut ChunkWriter<'_>,
    ) -> Result<(), PayloadError> {
        check_input(max_payload_size, frame)?;
        for samples in frame.chunks(max_payload_size) {
            writer.push(&[samples])?;
        }
        Ok(())
    }

    fn depayload(&self, chunks: &[Bytes]) -> Result<Bytes, PayloadError> {
        Ok(concat_chunks(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_20ms_frame_is_one_chunk() {
        let frame = vec![0xFF; 160];
        let size = G711Payloader.measure(1300, &frame).unwrap();
        assert_eq!(size.chunk_count, 1);
        assert_eq!(size.total_len, 160);
    }

    #[test]
    fn test_long_frame_is_split() {
        let frame: Vec<u8> = (0..=255).cycle().take(3000).collect();
        let size = G711Payloader.measure(1300, &frame).unwrap();
        assert_eq!(size.chunk_count, 3);

        let mut payload = vec![0u8; size.total_len];
        let mut lengths = vec![0u32; size.chunk_count];
        G711Payloader.fill(1300, &frame, &mut payload, &mut lengths).unwrap();
        assert_eq!(lengths, vec![1300, 1300, 400]);
        assert_eq!(payload, frame);
    }

    #[test]
    fn test_depayload_concatenates() {
        let chunks = vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cd")];
        assert_eq!(&G711Payloader.depayload(&chunks).unwrap()[..], b"abcd");
    }
}
