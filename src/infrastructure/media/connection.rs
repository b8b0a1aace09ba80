//! Peer connection state shared by its transceivers

use super::payload::PayloaderRegistry;
use super::srtp::RtpProtector;
use super::transport::PacketTransport;
use crate::config::MediaConfig;
use crate::domain::shared::Result;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// State reachable from every transceiver on one connection
pub(crate) struct ConnectionShared {
    pub(crate) id: Uuid,
    /// Absent until the secure channel is established. Held for the whole
    /// of every send so frames from different transceivers never interleave
    /// their encrypt and transmit steps.
    pub(crate) protector: Mutex<Option<Box<dyn RtpProtector>>>,
    pub(crate) transport: Arc<dyn PacketTransport>,
    pub(crate) payloaders: PayloaderRegistry,
    pub(crate) config: MediaConfig,
}

/// Peer connection
///
/// Owns the encryption context and transport. Transceivers keep only a weak
/// reference, so dropping the connection closes every transceiver on it.
pub struct PeerConnection {
    shared: Arc<ConnectionShared>,
}

impl PeerConnection {
    pub fn new(transport: Arc<dyn PacketTransport>, config: MediaConfig) -> Result<Self> {
        Self::with_registry(transport, config, PayloaderRegistry::default())
    }

    pub fn with_registry(
        transport: Arc<dyn PacketTransport>,
        config: MediaConfig,
        payloaders: PayloaderRegistry,
    ) -> Result<Self> {
        config.validate()?;

        let id = Uuid::new_v4();
        info!("Created peer connection {}", id);

        Ok(Self {
            shared: Arc::new(ConnectionShared {
                id,
                protector: Mutex::new(None),
                transport,
                payloaders,
                config,
            }),
        })
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn config(&self) -> &MediaConfig {
        &self.shared.config
    }

    pub fn payloaders(&self) -> &PayloaderRegistry {
        &self.shared.payloaders
    }

    /// Make the connection secure, returning the context it replaces
    pub async fn install_protector(
        &self,
        protector: Box<dyn RtpProtector>,
    ) -> Option<Box<dyn RtpProtector>> {
        let previous = self.shared.protector.lock().await.replace(protector);
        info!("Connection {} is secure", self.shared.id);
        previous
    }

    /// Drop back to the not-ready state
    pub async fn clear_protector(&self) -> Option<Box<dyn RtpProtector>> {
        let previous = self.shared.protector.lock().await.take();
        if previous.is_some() {
            info!("Connection {} encryption context cleared", self.shared.id);
        }
        previous
    }

    pub async fn is_secure(&self) -> bool {
        self.shared.protector.lock().await.is_some()
    }

    pub(crate) fn downgrade(&self) -> Weak<ConnectionShared> {
        Arc::downgrade(&self.shared)
    }
}

impl fmt::Debug for PeerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerConnection")
            .field("id", &self.shared.id)
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}
