//! Media domain types

pub mod codec;
pub mod frame;
pub mod track;

pub use codec::{Codec, MediaKind, OPUS_CLOCK_RATE, PCM_CLOCK_RATE, VIDEO_CLOCK_RATE};
pub use frame::{
    convert_rtp_to_timestamp, convert_timestamp_to_rtp, Frame, HUNDREDS_OF_NANOS_IN_A_SECOND,
};
pub use track::{MediaStreamTrack, TransceiverDirection};
