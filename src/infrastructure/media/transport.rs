//! Packet transport seam

use crate::config::TransportConfig;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Transport closed")]
    Closed,
}

/// Sends one serialized (and possibly encrypted) RTP packet
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PacketTransport: Send + Sync {
    async fn send_packet(&self, data: &[u8]) -> Result<(), TransportError>;
}

/// UDP transport to a single remote peer
#[derive(Debug, Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
}

impl UdpTransport {
    pub async fn bind(config: &TransportConfig) -> Result<Self, TransportError> {
        let remote: SocketAddr = config
            .remote_address
            .parse()
            .map_err(|_| TransportError::InvalidAddress(config.remote_address.clone()))?;

        let socket = UdpSocket::bind(&config.bind_address).await?;
        info!(
            "RTP socket bound to {}, sending to {}",
            socket.local_addr()?,
            remote
        );

        Ok(Self {
            socket: Arc::new(socket),
            remote,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// Receive one datagram from any peer
    pub async fn recv(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
        Ok(self.socket.recv_from(buf).await?)
    }
}

#[async_trait]
impl PacketTransport for UdpTransport {
    async fn send_packet(&self, data: &[u8]) -> Result<(), TransportError> {
        let sent = self.socket.send_to(data, self.remote).await?;
        debug!("Sent {} bytes to {}", sent, self.remote);
        Ok(())
    }
}
