//! Codec to payloader mapping

use super::{G711Payloader, H264Payloader, OpusPayloader, Payloader, Vp8Payloader};
use crate::domain::media::{Codec, OPUS_CLOCK_RATE, PCM_CLOCK_RATE, VIDEO_CLOCK_RATE};
use crate::domain::shared::{MediaError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Fragmentation strategy plus the RTP clock rate it runs at
#[derive(Clone)]
pub struct PayloaderEntry {
    pub payloader: Arc<dyn Payloader>,
    pub clock_rate: u32,
}

impl fmt::Debug for PayloaderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloaderEntry")
            .field("clock_rate", &self.clock_rate)
            .finish_non_exhaustive()
    }
}

/// Payloader Registry
///
/// Adding a codec means registering one entry; the send pipeline never
/// matches on codecs itself.
#[derive(Debug, Clone)]
pub struct PayloaderRegistry {
    entries: HashMap<Codec, PayloaderEntry>,
}

impl PayloaderRegistry {
    /// Registry without any codec
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register or replace the payloader for `codec`, returning the previous entry
    pub fn register(
        &mut self,
        codec: Codec,
        clock_rate: u32,
        payloader: Arc<dyn Payloader>,
    ) -> Option<PayloaderEntry> {
        self.entries.insert(
            codec,
            PayloaderEntry {
                payloader,
                clock_rate,
            },
        )
    }

    pub fn resolve(&self, codec: Codec) -> Result<&PayloaderEntry> {
        self.entries
            .get(&codec)
            .ok_or(MediaError::NotImplemented(codec))
    }

    pub fn supports(&self, codec: Codec) -> bool {
        self.entries.contains_key(&codec)
    }
}

impl Default for PayloaderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        let g711: Arc<dyn Payloader> = Arc::new(G711Payloader);

        registry.register(Codec::H264, VIDEO_CLOCK_RATE, Arc::new(H264Payloader));
        registry.register(Codec::Vp8, VIDEO_CLOCK_RATE, Arc::new(Vp8Payloader));
        registry.register(Codec::Opus, OPUS_CLOCK_RATE, Arc::new(OpusPayloader));
        registry.register(Codec::Mulaw, PCM_CLOCK_RATE, g711.clone());
        registry.register(Codec::Alaw, PCM_CLOCK_RATE, g711);
        registry
    }
}
