//! Transceiver lifecycle and receive path integration tests

use async_trait::async_trait;
use rtc_transceiver::config::MediaConfig;
use rtc_transceiver::infrastructure::media::{
    JitterBuffer, JitterBufferConfig, PacketTransport, SrtpError, TransportError,
};
use rtc_transceiver::{
    Codec, Frame, MediaError, MediaStreamTrack, PeerConnection, RtpProtector, Transceiver,
    TransceiverDirection,
};
use std::sync::{Arc, Mutex};
use tokio_test::assert_ok;

#[derive(Default)]
struct LoopbackTransport {
    sent: Mutex<Vec<Vec<u8>>>,
}

impl LoopbackTransport {
    fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

#[async_trait]
impl PacketTransport for LoopbackTransport {
    async fn send_packet(&self, data: &[u8]) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(data.to_vec());
        Ok(())
    }
}

/// Leaves packets in the clear
struct NullProtector;

impl RtpProtector for NullProtector {
    fn protect_rtp(&mut self, _packet: &mut Vec<u8>) -> Result<(), SrtpError> {
        Ok(())
    }
}

fn connection(config: MediaConfig) -> (PeerConnection, Arc<LoopbackTransport>) {
    let transport = Arc::new(LoopbackTransport::default());
    let conn = PeerConnection::new(transport.clone(), config).unwrap();
    (conn, transport)
}

fn jitter_buffer() -> JitterBuffer {
    JitterBuffer::new(JitterBufferConfig {
        min_delay_ms: 0,
        max_delay_ms: 5_000,
        max_packets: 256,
    })
}

fn create(
    conn: &PeerConnection,
    direction: TransceiverDirection,
    codec: Codec,
) -> Result<Transceiver, MediaError> {
    Transceiver::new(
        direction,
        conn,
        0x0BAD_CAFE,
        MediaStreamTrack::new("track", "stream", codec),
        Some(jitter_buffer()),
        codec,
    )
}

#[test]
fn test_create_and_destroy() {
    let (conn, _) = connection(MediaConfig::default());
    let mut handle = Some(create(&conn, TransceiverDirection::SendRecv, Codec::Vp8).unwrap());

    let t = handle.as_ref().unwrap();
    assert_eq!(t.direction(), TransceiverDirection::SendRecv);
    assert_eq!(t.codec(), Codec::Vp8);
    assert_eq!(t.receive_codec(), Codec::Vp8);
    assert!(t.jitter_buffer().is_some());
    assert!(!t.has_frame_callback());

    for _ in 0..3 {
        Transceiver::destroy(&mut handle);
        assert!(handle.is_none());
    }

    let mut never_created: Option<Transceiver> = None;
    Transceiver::destroy(&mut never_created);
    assert!(never_created.is_none());
}

#[test]
fn test_create_out_of_memory_leaves_no_handle() {
    let configs = [
        MediaConfig {
            initial_payload_capacity: usize::MAX,
            ..MediaConfig::default()
        },
        MediaConfig {
            initial_chunk_capacity: usize::MAX,
            ..MediaConfig::default()
        },
    ];

    for config in configs {
        let (conn, _) = connection(config);
        let result = create(&conn, TransceiverDirection::SendOnly, Codec::H264);
        assert!(matches!(result, Err(MediaError::OutOfMemory(_))));

        let mut handle = result.ok();
        assert!(handle.is_none());
        Transceiver::destroy(&mut handle);
    }
}

#[test]
fn test_create_rejects_unnamed_track() {
    let (conn, _) = connection(MediaConfig::default());
    let result = Transceiver::new(
        TransceiverDirection::SendOnly,
        &conn,
        1,
        MediaStreamTrack::new("", "stream", Codec::Opus),
        None,
        Codec::Opus,
    );
    assert!(matches!(result, Err(MediaError::InvalidArgument(_))));
}

#[test]
fn test_jitter_buffer_replacement_hands_back_previous() {
    let (conn, _) = connection(MediaConfig::default());
    let mut t = create(&conn, TransceiverDirection::RecvOnly, Codec::Opus).unwrap();

    let replacement = JitterBuffer::new(JitterBufferConfig {
        max_packets: 16,
        ..JitterBufferConfig::default()
    });
    let previous = t.set_jitter_buffer(replacement).unwrap();
    assert_eq!(previous.config().max_packets, 256);
    assert_eq!(t.jitter_buffer().unwrap().config().max_packets, 16);
}

#[tokio::test]
async fn test_send_after_connection_dropped() {
    let (conn, _) = connection(MediaConfig::default());
    conn.install_protector(Box::new(NullProtector)).await;
    let mut t = create(&conn, TransceiverDirection::SendOnly, Codec::Opus).unwrap();

    drop(conn);
    let result = t.send_frame(&Frame::new(0, vec![1, 2, 3])).await;
    assert!(matches!(result, Err(MediaError::ConnectionClosed)));
}

#[tokio::test]
async fn test_frames_round_trip_through_receive_path() {
    let (local, transport) = connection(MediaConfig::default());
    local.install_protector(Box::new(NullProtector)).await;
    let (remote, _) = connection(MediaConfig::default());

    let mut tx = create(&local, TransceiverDirection::SendOnly, Codec::H264).unwrap();
    let mut rx = create(&remote, TransceiverDirection::RecvOnly, Codec::H264).unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    rx.on_frame(move |frame| sink.lock().unwrap().push(frame.clone()));

    let mut idr = vec![0, 0, 0, 1, 0x65];
    idr.extend((0..5000u32).map(|i| (i % 97) as u8 + 1));
    let frames = [
        Frame::new(0, idr),
        Frame::new(333_333, vec![0, 0, 0, 1, 0x41, 9, 9, 9]),
    ];

    let mut wire = Vec::new();
    for frame in &frames {
        assert_ok!(tx.send_frame(frame).await);
        wire.extend(transport.take());
    }
    assert_eq!(wire.len(), 5);

    // Deliver out of order; nothing is released until the gap closes
    wire.swap(1, 3);
    let mut delivered = 0;
    for packet in &wire {
        delivered += assert_ok!(rx.receive_rtp_bytes(packet));
    }
    assert_eq!(delivered, 2);

    let received = received.lock().unwrap();
    assert_eq!(received[0].data, frames[0].data);
    assert_eq!(received[0].presentation_ts, 0);
    assert_eq!(received[1].data, frames[1].data);
    // 2999 ticks at 90 kHz
    assert_eq!(received[1].presentation_ts, 333_222);

    let stats = rx.jitter_buffer().unwrap().stats();
    assert_eq!(stats.frames_assembled, 2);
    assert_eq!(stats.buffer_size, 0);
}

#[tokio::test]
async fn test_opus_stream_reaches_callback_in_order() {
    let (local, transport) = connection(MediaConfig::default());
    local.install_protector(Box::new(NullProtector)).await;
    let (remote, _) = connection(MediaConfig::default());

    let mut tx = create(&local, TransceiverDirection::SendOnly, Codec::Opus).unwrap();
    tx.set_sequence_number(65533);
    let mut rx = create(&remote, TransceiverDirection::SendRecv, Codec::Opus).unwrap();

    let timestamps = Arc::new(Mutex::new(Vec::new()));
    let sink = timestamps.clone();
    rx.on_frame(move |frame| sink.lock().unwrap().push(frame.presentation_ts));

    for i in 0..5u64 {
        assert_ok!(tx.send_frame(&Frame::new(i * 200_000, vec![i as u8 + 1; 60])).await);
    }
    for packet in transport.take() {
        assert_ok!(rx.receive_rtp_bytes(&packet));
    }

    assert_eq!(
        *timestamps.lock().unwrap(),
        vec![0, 200_000, 400_000, 600_000, 800_000]
    );
}

#[tokio::test]
async fn test_held_frames_are_released_by_polling() {
    let (local, transport) = connection(MediaConfig::default());
    local.install_protector(Box::new(NullProtector)).await;
    let (remote, _) = connection(MediaConfig::default());

    let mut tx = create(&local, TransceiverDirection::SendOnly, Codec::Opus).unwrap();
    let mut rx = create(&remote, TransceiverDirection::RecvOnly, Codec::Opus).unwrap();
    rx.set_jitter_buffer(JitterBuffer::new(JitterBufferConfig::default()));

    let timestamps = Arc::new(Mutex::new(Vec::new()));
    let sink = timestamps.clone();
    rx.on_frame(move |frame| sink.lock().unwrap().push(frame.presentation_ts));

    for i in 0..3u64 {
        assert_ok!(tx.send_frame(&Frame::new(i * 200_000, vec![7; 40])).await);
    }
    let mut delivered = 0;
    for packet in transport.take() {
        delivered += assert_ok!(rx.receive_rtp_bytes(&packet));
    }
    // The last frame is still inside its minimum hold time
    assert!(delivered < 3);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(delivered + assert_ok!(rx.poll_frames()), 3);
    assert_eq!(*timestamps.lock().unwrap(), vec![0, 200_000, 400_000]);
    assert_eq!(rx.jitter_buffer().unwrap().stats().buffer_size, 0);
}
