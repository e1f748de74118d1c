//! Media packet framing.
//!
//! With frame meta enabled, every packet on a media socket is framed as:
//!
//! ```text
//! ┌──────────────────┬──────────────┬─────────────────────────┐
//! │ pts+flags (u64)  │ size (u32)   │ payload (size bytes)    │
//! └──────────────────┴──────────────┴─────────────────────────┘
//! ```
//!
//! How configuration packets and key frames are marked depends on the
//! version's [`PacketFraming`].  Without frame meta the socket carries a raw
//! elementary stream and every chunk read becomes a [`MediaStreamPacket::Data`]
//! with no timestamp.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use super::{MediaError, PacketFraming};

/// Largest payload accepted in a single packet (64 MiB).
pub const MAX_PACKET_SIZE: usize = 64 * 1024 * 1024;

const FRAME_HEADER_LENGTH: usize = 12;

const PACKET_FLAG_CONFIG: u64 = 1 << 63;
const PACKET_FLAG_KEY_FRAME: u64 = 1 << 62;
const PTS_MASK: u64 = PACKET_FLAG_KEY_FRAME - 1;
const NO_PTS: u64 = u64::MAX;

/// One packet read from a media socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaStreamPacket {
    /// Codec configuration (SPS/PPS, codec-specific data).
    Configuration { data: Bytes },
    Data {
        /// `None` when the framing cannot tell.
        keyframe: Option<bool>,
        pts: Option<u64>,
        data: Bytes,
    },
}

impl PacketFraming {
    fn classify(self, pts_and_flags: u64, data: Bytes) -> MediaStreamPacket {
        match self {
            PacketFraming::PtsSentinel if pts_and_flags == NO_PTS => {
                MediaStreamPacket::Configuration { data }
            }
            PacketFraming::PtsSentinel => MediaStreamPacket::Data {
                keyframe: None,
                pts: Some(pts_and_flags),
                data,
            },
            PacketFraming::Flagged if pts_and_flags & PACKET_FLAG_CONFIG != 0 => {
                MediaStreamPacket::Configuration { data }
            }
            PacketFraming::Flagged => MediaStreamPacket::Data {
                keyframe: Some(pts_and_flags & PACKET_FLAG_KEY_FRAME != 0),
                pts: Some(pts_and_flags & PTS_MASK),
                data,
            },
        }
    }
}

/// Splits a media socket into [`MediaStreamPacket`]s.
#[derive(Debug, Clone, Copy)]
pub struct MediaPacketDecoder {
    framing: PacketFraming,
    frame_meta: bool,
}

impl MediaPacketDecoder {
    pub fn new(framing: PacketFraming, frame_meta: bool) -> Self {
        Self {
            framing,
            frame_meta,
        }
    }
}

impl Decoder for MediaPacketDecoder {
    type Item = MediaStreamPacket;
    type Error = MediaError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !self.frame_meta {
            if src.is_empty() {
                return Ok(None);
            }
            return Ok(Some(MediaStreamPacket::Data {
                keyframe: None,
                pts: None,
                data: src.split().freeze(),
            }));
        }

        if src.len() < FRAME_HEADER_LENGTH {
            src.reserve(FRAME_HEADER_LENGTH - src.len());
            return Ok(None);
        }

        let mut header = &src[..FRAME_HEADER_LENGTH];
        let pts_and_flags = header.get_u64();
        let size = header.get_u32() as usize;

        if size > MAX_PACKET_SIZE {
            return Err(MediaError::PacketTooLarge {
                size,
                max: MAX_PACKET_SIZE,
            });
        }

        let total = FRAME_HEADER_LENGTH + size;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(FRAME_HEADER_LENGTH);
        let data = src.split_to(size).freeze();
        trace!("media packet: {} bytes, pts_and_flags={:#018x}", size, pts_and_flags);
        Ok(Some(self.framing.classify(pts_and_flags, data)))
    }
}
