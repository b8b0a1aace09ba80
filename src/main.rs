use rtc_transceiver::config::{Config, TransportConfig};
use rtc_transceiver::domain::media::HUNDREDS_OF_NANOS_IN_A_SECOND;
use rtc_transceiver::infrastructure::media::metrics::describe_metrics;
use rtc_transceiver::infrastructure::media::{
    JitterBuffer, PeerConnection, RtpPacket, SendOutcome, SenderStats, SrtpContext, SrtpMasterKey,
    SrtpProfile, Transceiver, UdpTransport,
};
use rtc_transceiver::{Codec, Frame, MediaStreamTrack, TransceiverDirection};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const AUDIO_FRAMES: u64 = 50;
const VIDEO_FRAMES: u64 = 30;
const POLL_INTERVAL: Duration = Duration::from_millis(20);
const IDLE_TIMEOUT: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting rtc-transceiver demo");

    // Load configuration
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let mut config = Config::load(config_path.as_deref())?;
    describe_metrics();

    // Loopback peer that receives and decrypts what we send
    let peer_transport = Arc::new(
        UdpTransport::bind(&TransportConfig {
            bind_address: "127.0.0.1:0".to_string(),
            remote_address: "127.0.0.1:9".to_string(),
        })
        .await?,
    );
    config.transport.remote_address = peer_transport.local_addr()?.to_string();
    info!("Configuration loaded: {:?}", config);

    let transport = Arc::new(UdpTransport::bind(&config.transport).await?);
    let local = PeerConnection::new(transport, config.media.clone())?;
    let peer = PeerConnection::new(peer_transport.clone(), config.media.clone())?;

    let stream_id = Uuid::new_v4().to_string();
    let mut audio = Transceiver::new(
        TransceiverDirection::SendRecv,
        &local,
        rand::random(),
        MediaStreamTrack::new("audio0", stream_id.clone(), Codec::Opus),
        None,
        Codec::Opus,
    )?;
    let video = Transceiver::new(
        TransceiverDirection::SendOnly,
        &local,
        rand::random(),
        MediaStreamTrack::new("video0", stream_id, Codec::H264),
        None,
        Codec::H264,
    )?;

    // Nothing goes out before the secure channel exists
    let outcome = audio.send_frame(&opus_frame(0)).await?;
    info!("Frame before SRTP setup: {:?}", outcome);

    let master_key = SrtpMasterKey::generate();
    let profile = SrtpProfile::Aes128CmHmacSha1_80;
    local
        .install_protector(Box::new(SrtpContext::new(&master_key, profile)))
        .await;

    let receiver = tokio::spawn(receive_loop(
        peer_transport,
        peer,
        SrtpContext::new(&master_key, profile),
        [(audio.ssrc(), Codec::Opus), (video.ssrc(), Codec::H264)],
        config.jitter.clone(),
    ));

    let audio_task = tokio::spawn(send_loop(audio, AUDIO_FRAMES, Duration::from_millis(20), opus_frame));
    let video_task = tokio::spawn(send_loop(video, VIDEO_FRAMES, Duration::from_millis(33), h264_frame));

    let (audio_stats, video_stats) = futures::future::try_join(audio_task, video_task).await?;
    let (audio_stats, video_stats) = (audio_stats?, video_stats?);
    info!("Audio sender: {:?}", audio_stats);
    info!("Video sender: {:?}", video_stats);

    let received = receiver.await??;
    info!("Peer reassembled {} frames", received);

    Ok(())
}

async fn send_loop(
    mut transceiver: Transceiver,
    frames: u64,
    period: Duration,
    make_frame: fn(u64) -> Frame,
) -> rtc_transceiver::Result<SenderStats> {
    let mut ticker = tokio::time::interval(period);
    let period_hns = period.as_nanos() as u64 / 100;

    for i in 0..frames {
        ticker.tick().await;
        match transceiver.send_frame(&make_frame(i * period_hns)).await? {
            SendOutcome::Sent { .. } => {}
            SendOutcome::Dropped(reason) => warn!("Frame {} dropped: {:?}", i, reason),
        }
    }

    let stats = transceiver.sender_stats();
    Transceiver::destroy(&mut Some(transceiver));
    Ok(stats)
}

async fn receive_loop(
    transport: Arc<UdpTransport>,
    peer: PeerConnection,
    mut srtp: SrtpContext,
    streams: [(u32, Codec); 2],
    jitter: rtc_transceiver::infrastructure::media::JitterBufferConfig,
) -> anyhow::Result<usize> {
    let frames = Arc::new(AtomicUsize::new(0));
    let mut receivers = Vec::with_capacity(streams.len());

    for (i, (ssrc, codec)) in streams.into_iter().enumerate() {
        let mut transceiver = Transceiver::new(
            TransceiverDirection::RecvOnly,
            &peer,
            rand::random(),
            MediaStreamTrack::new(format!("remote{}", i), "remote", codec),
            Some(JitterBuffer::new(jitter.clone())),
            codec,
        )?;
        let counter = frames.clone();
        transceiver.on_frame(move |frame| {
            counter.fetch_add(1, Ordering::Relaxed);
            info!(
                "Received {} frame at {:.3}s, {} bytes",
                codec,
                frame.presentation_ts as f64 / HUNDREDS_OF_NANOS_IN_A_SECOND as f64,
                frame.len()
            );
        });
        receivers.push((ssrc, transceiver));
    }

    let mut buf = vec![0u8; 2048];
    let mut last_packet = Instant::now();
    while last_packet.elapsed() < IDLE_TIMEOUT {
        let received = tokio::time::timeout(POLL_INTERVAL, transport.recv(&mut buf)).await;
        let Ok(received) = received else {
            // Release frames still held by the jitter buffers
            for (_, transceiver) in receivers.iter_mut() {
                transceiver.poll_frames()?;
            }
            continue;
        };
        let (len, _) = received?;
        last_packet = Instant::now();

        let mut packet = buf[..len].to_vec();
        if let Err(e) = srtp.unprotect_rtp(&mut packet) {
            warn!("Dropping undecryptable packet: {}", e);
            continue;
        }

        let packet = RtpPacket::parse(&packet)?;
        if let Some((_, transceiver)) = receivers.iter_mut().find(|(ssrc, _)| *ssrc == packet.ssrc) {
            transceiver.receive_rtp_packet(packet)?;
        }
    }

    Ok(frames.load(Ordering::Relaxed))
}

fn opus_frame(pts: u64) -> Frame {
    Frame::new(pts, vec![0xF8; 120])
}

/// SPS, PPS and an IDR slice large enough to need FU-A fragmentation
fn h264_frame(pts: u64) -> Frame {
    let mut data = vec![0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1F, 0, 0, 0, 1, 0x68, 0xCE, 0x3C, 0x80];
    data.extend_from_slice(&[0, 0, 0, 1, 0x65]);
    data.extend((0..4000u32).map(|i| (i % 251) as u8 | 1));
    Frame::new(pts, data).key_frame()
}
