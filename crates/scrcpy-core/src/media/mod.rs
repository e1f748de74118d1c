//! Video and audio stream headers, and the media packet decoder.
//!
//! When a media socket opens, the agent first writes a small header (device
//! name, codec, frame size) and then a sequence of framed packets.  The
//! header is read once by [`metadata`]; the packets are split by the
//! [`packet::MediaPacketDecoder`] codec.

pub mod metadata;
pub mod packet;

use thiserror::Error;

use crate::options::{AudioCodec, VideoCodec};

pub use metadata::{
    parse_audio_stream_metadata, parse_video_stream_metadata, AudioStream, VideoStream,
    VideoStreamMetadata, DEVICE_NAME_FIELD_LENGTH,
};
pub use packet::{MediaPacketDecoder, MediaStreamPacket, MAX_PACKET_SIZE};

/// Layout of the video stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoHeaderLayout {
    /// 64-byte device name, u16 width, u16 height; codec is always H.264.
    DeviceMeta,
    /// Optional device name, then optional u32 codec id, width and height (2.0+).
    CodecMeta,
}

/// How media packets mark configuration and key frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketFraming {
    /// Configuration packets carry `pts == u64::MAX`; no key-frame flag.
    PtsSentinel,
    /// Bit 63 marks configuration, bit 62 key frames (2.0+).
    Flagged,
}

/// Everything header and packet parsing needs to know about a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaStreamConfig {
    pub header: VideoHeaderLayout,
    pub framing: PacketFraming,
    pub send_device_meta: bool,
    pub send_codec_meta: bool,
    pub send_frame_meta: bool,
    pub video: bool,
    pub audio: bool,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
}

/// Errors raised while reading media streams.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("video is disabled for this session")]
    VideoDisabled,

    #[error("unknown video codec id {0:#010x}")]
    UnknownVideoCodec(u32),

    #[error("unknown audio codec id {0:#010x}")]
    UnknownAudioCodec(u32),

    #[error("media packet of {size} bytes exceeds the {max}-byte limit")]
    PacketTooLarge { size: usize, max: usize },

    #[error("media stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}
