//! RTP packet construction for one frame

use super::packet::RtpPacket;
use bytes::Bytes;

/// Build one packet per payload chunk.
///
/// Sequence numbers run from `start_sequence` and wrap modulo 2^16; every
/// packet carries the same timestamp and only the last has the marker bit.
/// The caller advances its own counter by the number of packets returned.
pub fn construct_rtp_packets<'a, I>(
    chunks: I,
    payload_type: u8,
    start_sequence: u16,
    timestamp: u32,
    ssrc: u32,
) -> Vec<RtpPacket>
where
    I: IntoIterator<Item = &'a [u8]>,
    I::IntoIter: ExactSizeIterator,
{
    let chunks = chunks.into_iter();
    let count = chunks.len();
    let mut packets = Vec::with_capacity(count);

    for (i, chunk) in chunks.enumerate() {
        let sequence = start_sequence.wrapping_add(i as u16);
        packets.push(
            RtpPacket::new(
                payload_type,
                sequence,
                timestamp,
                ssrc,
                Bytes::copy_from_slice(chunk),
            )
            .with_marker(i + 1 == count),
        );
    }

    packets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(sizes: &[usize]) -> Vec<Vec<u8>> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, size)| vec![i as u8; *size])
            .collect()
    }

    fn build(sizes: &[usize], start: u16) -> Vec<RtpPacket> {
        let data = chunks(sizes);
        construct_rtp_packets(data.iter().map(|c| c.as_slice()), 96, start, 4500, 0xCAFEBABE)
    }

    #[test]
    fn test_single_chunk_has_marker() {
        let packets = build(&[100], 10);
        assert_eq!(packets.len(), 1);
        assert!(packets[0].marker);
        assert_eq!(packets[0].sequence, 10);
    }

    #[test]
    fn test_marker_only_on_last_packet() {
        let packets = build(&[1200, 1200, 300], 0);
        let markers: Vec<bool> = packets.iter().map(|p| p.marker).collect();
        assert_eq!(markers, vec![false, false, true]);
    }

    #[test]
    fn test_header_fields_are_shared() {
        let packets = build(&[10, 20, 30, 40], 500);
        for (i, packet) in packets.iter().enumerate() {
            assert_eq!(packet.payload_type, 96);
            assert_eq!(packet.timestamp, 4500);
            assert_eq!(packet.ssrc, 0xCAFEBABE);
            assert_eq!(packet.payload.len(), (i + 1) * 10);
            assert!(packet.payload.iter().all(|b| *b == i as u8));
        }
    }

    #[test]
    fn test_contiguous_sequence_numbers() {
        for start in [0u16, 1, 1000, 32767, 65000] {
            let packets = build(&[1; 17], start);
            for (i, packet) in packets.iter().enumerate() {
                assert_eq!(packet.sequence, start.wrapping_add(i as u16));
            }
        }
    }

    #[test]
    fn test_sequence_wraparound() {
        let packets = build(&[5, 5, 5], 65534);
        let sequences: Vec<u16> = packets.iter().map(|p| p.sequence).collect();
        assert_eq!(sequences, vec![65534, 65535, 0]);
    }

    #[test]
    fn test_no_chunks_no_packets() {
        assert!(build(&[], 7).is_empty());
    }
}
