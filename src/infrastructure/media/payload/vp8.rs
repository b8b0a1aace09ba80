//! VP8 payloader (RFC 7741)
//!
//! Every packet starts with a one-byte payload descriptor. Only the S bit
//! (start of partition 0) is set by the sender; no extensions are emitted.

use super::{check_input, ChunkWriter, PayloadError, Payloader};
use bytes::Bytes;

const DESCRIPTOR_SIZE: usize = 1;
const X_BIT: u8 = 0x80;
const S_BIT: u8 = 0x10;
const I_BIT: u8 = 0x80;
const L_BIT: u8 = 0x40;
const T_BIT: u8 = 0x20;
const K_BIT: u8 = 0x10;
const M_BIT: u8 = 0x80;

#[derive(Debug, Clone, Copy, Default)]
pub struct Vp8Payloader;

impl Payloader for Vp8Payloader {
    fn write_chunks(
        &self,
        max_payload_size: usize,
        frame: &[u8],
        writer: &mut ChunkWriter<'_>,
    ) -> Result<(), PayloadError> {
        check_input(max_payload_size, frame)?;
        if max_payload_size <= DESCRIPTOR_SIZE {
            return Err(PayloadError::InvalidMaxPayloadSize(max_payload_size));
        }

        for (i, fragment) in frame.chunks(max_payload_size - DESCRIPTOR_SIZE).enumerate() {
            let descriptor = if i == 0 { S_BIT } else { 0 };
            writer.push(&[&[descriptor], fragment])?;
        }

        Ok(())
    }

    fn depayload(&self, chunks: &[Bytes]) -> Result<Bytes, PayloadError> {
        let mut out = Vec::with_capacity(chunks.iter().map(|c| c.len()).sum());
        for chunk in chunks {
            let offset = descriptor_len(chunk)?;
            out.extend_from_slice(&chunk[offset..]);
        }
        Ok(Bytes::from(out))
    }
}

/// Length of the payload descriptor at the start of `chunk`
fn descriptor_len(chunk: &[u8]) -> Result<usize, PayloadError> {
    let truncated = || PayloadError::Malformed("truncated VP8 payload descriptor".to_string());

    let first = *chunk.first().ok_or_else(truncated)?;
    let mut len = DESCRIPTOR_SIZE;
    if first & X_BIT == 0 {
        return Ok(len);
    }

    let ext = *chunk.get(len).ok_or_else(truncated)?;
    len += 1;
    if ext & I_BIT != 0 {
        let picture_id = *chunk.get(len).ok_or_else(truncated)?;
        len += if picture_id & M_BIT != 0 { 2 } else { 1 };
    }
    if ext & L_BIT != 0 {
        len += 1;
    }
    if ext & (T_BIT | K_BIT) != 0 {
        len += 1;
    }

    if len > chunk.len() {
        return Err(truncated());
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_on_every_chunk() {
        let frame: Vec<u8> = (0..20).collect();
        let size = Vp8Payloader.measure(8, &frame).unwrap();
        // 7 frame bytes per packet
        assert_eq!(size.chunk_count, 3);
        assert_eq!(size.total_len, 20 + 3);

        let mut payload = vec![0u8; size.total_len];
        let mut lengths = vec![0u32; size.chunk_count];
        Vp8Payloader.fill(8, &frame, &mut payload, &mut lengths).unwrap();
        assert_eq!(lengths, vec![8, 8, 7]);
        assert_eq!(payload[0], S_BIT);
        assert_eq!(payload[8], 0);
        assert_eq!(payload[16], 0);
    }

    #[test]
    fn test_depayload_strips_descriptors() {
        let chunks = vec![
            Bytes::from_static(&[S_BIT, 1, 2, 3]),
            Bytes::from_static(&[0x00, 4, 5]),
        ];
        assert_eq!(&Vp8Payloader.depayload(&chunks).unwrap()[..], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_depayload_extended_descriptor() {
        // X, I with 15-bit picture id, L, T/K
        let chunk = Bytes::from_static(&[X_BIT | S_BIT, I_BIT | L_BIT | T_BIT, 0x81, 0x23, 0x00, 0x40, 9, 9]);
        assert_eq!(&Vp8Payloader.depayload(&[chunk]).unwrap()[..], &[9, 9]);

        let truncated = Bytes::from_static(&[X_BIT, I_BIT]);
        assert!(Vp8Payloader.depayload(&[truncated]).is_err());
    }

    #[test]
    fn test_small_max_payload_size() {
        assert_eq!(
            Vp8Payloader.measure(1, &[1, 2]),
            Err(PayloadError::InvalidMaxPayloadSize(1))
        );
    }
}
