//! Video and audio stream header parsing.
//!
//! Headers are read with `read_exact`, one field at a time, so a transport
//! that delivers the header in several pieces is handled naturally and no
//! byte past the header is ever consumed.  The stream is handed back to the
//! caller untouched after the header.

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use super::{MediaError, MediaStreamConfig, VideoHeaderLayout};
use crate::options::{AudioCodec, VideoCodec};

/// Size of the NUL-padded device name field.
pub const DEVICE_NAME_FIELD_LENGTH: usize = 64;

/// Codec id the agent sends when audio capture is disabled on the device.
const AUDIO_DISABLED_BY_DEVICE: u32 = 0;

/// Codec id the agent sends when audio capture failed to start.
const AUDIO_CONFIGURATION_ERROR: u32 = 1;

/// What the video header said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoStreamMetadata {
    pub device_name: Option<String>,
    pub codec: VideoCodec,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A video stream positioned at its first packet.
#[derive(Debug)]
pub struct VideoStream<R> {
    pub metadata: VideoStreamMetadata,
    pub stream: R,
}

/// The outcome of opening the audio stream.
#[derive(Debug)]
pub enum AudioStream<R> {
    /// The session has no audio, or the device refused to capture it.
    Disabled,
    /// The device tried to capture audio and failed.
    Errored,
    Enabled {
        device_name: Option<String>,
        codec: AudioCodec,
        stream: R,
    },
}

/// Decodes a NUL-padded device name field.
pub fn decode_device_name(field: &[u8]) -> String {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

async fn read_device_name<R>(stream: &mut R) -> Result<String, MediaError>
where
    R: AsyncRead + Unpin,
{
    let mut field = [0u8; DEVICE_NAME_FIELD_LENGTH];
    stream.read_exact(&mut field).await?;
    Ok(decode_device_name(&field))
}

/// Reads the video header from the front of `stream`.
pub async fn parse_video_stream_metadata<R>(
    config: &MediaStreamConfig,
    mut stream: R,
) -> Result<VideoStream<R>, MediaError>
where
    R: AsyncRead + Unpin,
{
    if !config.video {
        return Err(MediaError::VideoDisabled);
    }

    let metadata = match config.header {
        VideoHeaderLayout::DeviceMeta if !config.send_device_meta => VideoStreamMetadata {
            device_name: None,
            codec: VideoCodec::H264,
            width: None,
            height: None,
        },
        VideoHeaderLayout::DeviceMeta => {
            let device_name = read_device_name(&mut stream).await?;
            let width = stream.read_u16().await?;
            let height = stream.read_u16().await?;
            VideoStreamMetadata {
                device_name: Some(device_name),
                codec: VideoCodec::H264,
                width: Some(width.into()),
                height: Some(height.into()),
            }
        }
        VideoHeaderLayout::CodecMeta => {
            let device_name = if config.send_device_meta {
                Some(read_device_name(&mut stream).await?)
            } else {
                None
            };
            if config.send_codec_meta {
                let id = stream.read_u32().await?;
                let codec =
                    VideoCodec::from_codec_id(id).ok_or(MediaError::UnknownVideoCodec(id))?;
                let width = stream.read_u32().await?;
                let height = stream.read_u32().await?;
                VideoStreamMetadata {
                    device_name,
                    codec,
                    width: Some(width),
                    height: Some(height),
                }
            } else {
                VideoStreamMetadata {
                    device_name,
                    codec: config.video_codec,
                    width: None,
                    height: None,
                }
            }
        }
    };

    debug!(
        "video stream: codec={} size={:?}x{:?} device={:?}",
        metadata.codec, metadata.width, metadata.height, metadata.device_name
    );
    Ok(VideoStream { metadata, stream })
}

/// Reads the audio header from the front of `stream`.
///
/// The device name is only present when audio is the first stream, i.e. video
/// is disabled.
pub async fn parse_audio_stream_metadata<R>(
    config: &MediaStreamConfig,
    mut stream: R,
) -> Result<AudioStream<R>, MediaError>
where
    R: AsyncRead + Unpin,
{
    if !config.audio {
        return Ok(AudioStream::Disabled);
    }

    let device_name = if !config.video && config.send_device_meta {
        Some(read_device_name(&mut stream).await?)
    } else {
        None
    };

    if !config.send_codec_meta {
        return Ok(AudioStream::Enabled {
            device_name,
            codec: config.audio_codec,
            stream,
        });
    }

    match stream.read_u32().await? {
        AUDIO_DISABLED_BY_DEVICE => {
            debug!("audio disabled by device");
            Ok(AudioStream::Disabled)
        }
        AUDIO_CONFIGURATION_ERROR => {
            debug!("audio capture failed on device");
            Ok(AudioStream::Errored)
        }
        id => {
            let codec = AudioCodec::from_codec_id(id).ok_or(MediaError::UnknownAudioCodec(id))?;
            debug!("audio stream: codec={}", codec);
            Ok(AudioStream::Enabled {
                device_name,
                codec,
                stream,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::PacketFraming;
    use tokio_test::io::Builder;

    fn config_2_x() -> MediaStreamConfig {
        MediaStreamConfig {
            header: VideoHeaderLayout::CodecMeta,
            framing: PacketFraming::Flagged,
            send_device_meta: true,
            send_codec_meta: true,
            send_frame_meta: true,
            video: true,
            audio: true,
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Opus,
        }
    }

    fn device_name_field(name: &str) -> Vec<u8> {
        let mut field = vec![0u8; DEVICE_NAME_FIELD_LENGTH];
        field[..name.len()].copy_from_slice(name.as_bytes());
        field
    }

    #[test]
    fn test_device_name_stops_at_first_nul() {
        assert_eq!(decode_device_name(&device_name_field("Pixel 8")), "Pixel 8");
        assert_eq!(decode_device_name(b"no-terminator"), "no-terminator");
    }

    #[tokio::test]
    async fn test_codec_meta_header_split_across_reads() {
        // Arrange
        let name = device_name_field("Pixel 8");
        let mut header = b"h265".to_vec();
        header.extend_from_slice(&1080u32.to_be_bytes());
        header.extend_from_slice(&2400u32.to_be_bytes());
        let mock = Builder::new()
            .read(&name[..10])
            .read(&name[10..])
            .read(&header[..6])
            .read(&header[6..])
            .build();

        // Act
        let video = parse_video_stream_metadata(&config_2_x(), mock).await.unwrap();

        // Assert
        assert_eq!(
            video.metadata,
            VideoStreamMetadata {
                device_name: Some("Pixel 8".to_string()),
                codec: VideoCodec::H265,
                width: Some(1080),
                height: Some(2400),
            }
        );
    }

    #[tokio::test]
    async fn test_header_read_leaves_payload_untouched() {
        // Arrange
        let mut config = config_2_x();
        config.send_device_meta = false;
        let mut bytes = b"h264".to_vec();
        bytes.extend_from_slice(&720u32.to_be_bytes());
        bytes.extend_from_slice(&1280u32.to_be_bytes());
        bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let mock = Builder::new().read(&bytes).build();

        // Act
        let mut video = parse_video_stream_metadata(&config, mock).await.unwrap();
        let mut rest = Vec::new();
        video.stream.read_to_end(&mut rest).await.unwrap();

        // Assert
        assert_eq!(rest, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[tokio::test]
    async fn test_legacy_device_meta_header() {
        // Arrange
        let mut config = config_2_x();
        config.header = VideoHeaderLayout::DeviceMeta;
        let mut bytes = device_name_field("Galaxy");
        bytes.extend_from_slice(&1080u16.to_be_bytes());
        bytes.extend_from_slice(&1920u16.to_be_bytes());
        let mut stream: &[u8] = &bytes;

        // Act
        let video = parse_video_stream_metadata(&config, &mut stream).await.unwrap();

        // Assert
        assert_eq!(video.metadata.codec, VideoCodec::H264);
        assert_eq!(video.metadata.device_name.as_deref(), Some("Galaxy"));
        assert_eq!(video.metadata.width, Some(1080));
        assert_eq!(video.metadata.height, Some(1920));
    }

    #[tokio::test]
    async fn test_codec_meta_disabled_uses_configured_codec() {
        // Arrange
        let mut config = config_2_x();
        config.send_device_meta = false;
        config.send_codec_meta = false;
        config.video_codec = VideoCodec::Av1;
        let stream: &[u8] = &[0x00, 0x01];

        // Act
        let video = parse_video_stream_metadata(&config, stream).await.unwrap();

        // Assert
        assert_eq!(video.metadata.codec, VideoCodec::Av1);
        assert_eq!(video.metadata.width, None);
        assert_eq!(video.stream, &[0x00, 0x01]);
    }

    #[tokio::test]
    async fn test_unknown_video_codec_is_rejected() {
        let mut config = config_2_x();
        config.send_device_meta = false;
        let stream: &[u8] = b"vp90\0\0\0\0\0\0\0\0";
        let result = parse_video_stream_metadata(&config, stream).await;
        assert!(matches!(result, Err(MediaError::UnknownVideoCodec(0x7670_3930))));
    }

    #[tokio::test]
    async fn test_disabled_video_is_an_error() {
        let mut config = config_2_x();
        config.video = false;
        let result = parse_video_stream_metadata(&config, &b""[..]).await;
        assert!(matches!(result, Err(MediaError::VideoDisabled)));
    }

    #[tokio::test]
    async fn test_audio_sentinels() {
        // Arrange
        let config = config_2_x();

        // Act
        let disabled = parse_audio_stream_metadata(&config, &[0u8, 0, 0, 0][..]).await.unwrap();
        let errored = parse_audio_stream_metadata(&config, &[0u8, 0, 0, 1][..]).await.unwrap();

        // Assert
        assert!(matches!(disabled, AudioStream::Disabled));
        assert!(matches!(errored, AudioStream::Errored));
    }

    #[tokio::test]
    async fn test_audio_first_stream_carries_device_name() {
        // Arrange
        let mut config = config_2_x();
        config.video = false;
        let mut bytes = device_name_field("Tab S9");
        bytes.extend_from_slice(b"flac");
        let mock = Builder::new().read(&bytes).build();

        // Act
        let audio = parse_audio_stream_metadata(&config, mock).await.unwrap();

        // Assert
        let AudioStream::Enabled {
            device_name, codec, ..
        } = audio
        else {
            panic!("expected enabled audio");
        };
        assert_eq!(device_name.as_deref(), Some("Tab S9"));
        assert_eq!(codec, AudioCodec::Flac);
    }

    #[tokio::test]
    async fn test_audio_disabled_in_config_reads_nothing() {
        let mut config = config_2_x();
        config.audio = false;
        let mut stream: &[u8] = &[1, 2, 3, 4];
        let audio = parse_audio_stream_metadata(&config, &mut stream).await.unwrap();
        assert!(matches!(audio, AudioStream::Disabled));
        assert_eq!(stream.len(), 4);
    }
}
