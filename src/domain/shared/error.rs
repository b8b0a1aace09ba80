//! Media errors

use crate::domain::media::Codec;
use crate::infrastructure::media::payload::PayloadError;
use crate::infrastructure::media::rtp::RtpError;
use crate::infrastructure::media::srtp::SrtpError;
use crate::infrastructure::media::transport::TransportError;
use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),

    #[error("Codec not implemented: {0}")]
    NotImplemented(Codec),

    #[error("Payloader error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Encryption error: {0}")]
    Encryption(#[from] SrtpError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("RTP error: {0}")]
    Rtp(#[from] RtpError),

    #[error("Peer connection closed")]
    ConnectionClosed,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MediaError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
