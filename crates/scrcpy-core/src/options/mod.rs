//! The option matrix: per-version launch options and session setup.
//!
//! [`Options`] is the entry point for a session.  It is built for one
//! [`ProtocolVersion`] from a partial [`Init`], fills in that version's
//! defaults, applies the derived coercions once, and then owns everything
//! version-specific the session needs:
//!
//! * the launch arguments for the agent ([`Options::serialize`]),
//! * the control-message serializer and its ordinal table,
//! * the device-message channel with its clipboard and UHID sub-protocols,
//! * the media header parsers and packet decoder.

pub mod args;
pub(crate) mod defaults;
pub mod value;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{debug, info};

use crate::media::{
    self, AudioStream, MediaError, MediaPacketDecoder, MediaStreamConfig, VideoStream,
};
use crate::protocol::clipboard::SerializedSetClipboard;
use crate::protocol::control::{
    ControlMessage, ControlMessageSerializer, ControlMessageType, GetClipboardControlMessage,
    SetClipboardControlMessage,
};
use crate::protocol::device::{
    DeviceEventReceiver, DeviceMessageChannel, DeviceMessageError, DeviceMessageType,
    UHidOutputDeviceMessage,
};
use crate::protocol::scroll::ScrollController;
use crate::version::{ProtocolVersion, VersionProfile};

pub use args::ArgumentStyle;
pub use value::{
    AudioCodec, AudioSource, CameraFacing, CodecOptions, Crop, LogLevel, OptionKey, OptionKind,
    OptionValue, VideoCodec, VideoSource,
};

/// Errors raised while building or parsing options.
#[derive(Debug, Error, PartialEq)]
pub enum OptionsError {
    #[error("option `{key}` is not supported by protocol version {version}")]
    UnsupportedOption {
        key: String,
        version: ProtocolVersion,
    },

    #[error("invalid value `{value}` for option `{key}`")]
    InvalidValue { key: OptionKey, value: String },

    #[error("malformed launch argument `{0}`: expected key=value")]
    MalformedArgument(String),

    #[error("expected {expected} positional arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
}

// ── Init ──────────────────────────────────────────────────────────────────────

/// A partial set of launch options; anything absent takes the version default.
///
/// Equality ignores insertion order.
#[derive(Debug, Clone, Default)]
pub struct Init {
    values: Vec<(OptionKey, OptionValue)>,
}

impl Init {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing any earlier value.
    pub fn set(mut self, key: OptionKey, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: OptionKey, value: impl Into<OptionValue>) {
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.values.push((key, value)),
        }
    }

    pub fn get(&self, key: OptionKey) -> Option<&OptionValue> {
        self.values.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(OptionKey, OptionValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // Typed setters for the options callers touch most.

    pub fn log_level(self, level: LogLevel) -> Self {
        self.set(OptionKey::LogLevel, level)
    }

    pub fn max_size(self, max_size: u32) -> Self {
        self.set(OptionKey::MaxSize, max_size)
    }

    pub fn max_fps(self, max_fps: f64) -> Self {
        self.set(OptionKey::MaxFps, max_fps)
    }

    pub fn crop(self, crop: Crop) -> Self {
        self.set(OptionKey::Crop, crop)
    }

    pub fn control(self, control: bool) -> Self {
        self.set(OptionKey::Control, control)
    }

    pub fn clipboard_autosync(self, autosync: bool) -> Self {
        self.set(OptionKey::ClipboardAutosync, autosync)
    }

    pub fn send_device_meta(self, send: bool) -> Self {
        self.set(OptionKey::SendDeviceMeta, send)
    }

    pub fn send_codec_meta(self, send: bool) -> Self {
        self.set(OptionKey::SendCodecMeta, send)
    }

    pub fn send_frame_meta(self, send: bool) -> Self {
        self.set(OptionKey::SendFrameMeta, send)
    }

    pub fn video(self, enabled: bool) -> Self {
        self.set(OptionKey::Video, enabled)
    }

    pub fn video_codec(self, codec: VideoCodec) -> Self {
        self.set(OptionKey::VideoCodec, codec)
    }

    pub fn video_codec_options(self, options: CodecOptions) -> Self {
        self.set(OptionKey::VideoCodecOptions, options)
    }

    pub fn video_source(self, source: VideoSource) -> Self {
        self.set(OptionKey::VideoSource, source)
    }

    pub fn audio(self, enabled: bool) -> Self {
        self.set(OptionKey::Audio, enabled)
    }

    pub fn audio_codec(self, codec: AudioCodec) -> Self {
        self.set(OptionKey::AudioCodec, codec)
    }

    pub fn audio_source(self, source: AudioSource) -> Self {
        self.set(OptionKey::AudioSource, source)
    }

    pub fn audio_dup(self, dup: bool) -> Self {
        self.set(OptionKey::AudioDup, dup)
    }

    pub fn camera_facing(self, facing: CameraFacing) -> Self {
        self.set(OptionKey::CameraFacing, facing)
    }
}

impl PartialEq for Init {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .values
                .iter()
                .all(|(key, value)| other.get(*key) == Some(value))
    }
}

impl IntoIterator for Init {
    type Item = (OptionKey, OptionValue);
    type IntoIter = std::vec::IntoIter<(OptionKey, OptionValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

// ── Client options ────────────────────────────────────────────────────────────

/// How the agent process is launched on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnStrategy {
    #[default]
    Auto,
    /// Plain `adb shell` without a PTY protocol.
    Raw,
    /// `adb shell` using the shell v2 protocol.
    Shell,
}

/// Host-side settings that never reach the agent as options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Agent version string to launch with; defaults to the protocol version.
    pub version: Option<String>,
    pub spawner: SpawnStrategy,
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Fully resolved options for one session, plus its protocol handlers.
#[derive(Debug)]
pub struct Options {
    profile: &'static VersionProfile,
    client: ClientOptions,
    values: Vec<(OptionKey, OptionValue)>,
    serializer: ControlMessageSerializer,
    device: DeviceMessageChannel,
}

impl Options {
    pub fn new(version: ProtocolVersion, init: Init) -> Result<Self, OptionsError> {
        Self::with_client_options(version, init, ClientOptions::default())
    }

    /// Builds options for `version`.
    ///
    /// Fails if `init` names an option the version lacks or a value of the
    /// wrong kind.  Coercions run once, here.
    pub fn with_client_options(
        version: ProtocolVersion,
        init: Init,
        client: ClientOptions,
    ) -> Result<Self, OptionsError> {
        let profile = version.profile();
        let mut values = profile.defaults().to_vec();

        for (key, value) in init {
            let slot = values
                .iter_mut()
                .find(|(k, _)| *k == key)
                .ok_or_else(|| OptionsError::UnsupportedOption {
                    key: key.as_str().to_string(),
                    version,
                })?;
            let invalid = || OptionsError::InvalidValue {
                key,
                value: describe(&value),
            };
            let coerced = value
                .clone()
                .coerce(key.kind())
                .filter(|coerced| key.accepts(coerced))
                .ok_or_else(invalid)?;
            // Unwritten values may only replace unwritten defaults.
            match (coerced.to_option_string(), slot.1.to_option_string()) {
                (Some(_), _) => slot.1 = coerced,
                (None, None) => {}
                (None, Some(_)) => return Err(invalid()),
            }
        }

        apply_coercions(&mut values);

        let serializer =
            ControlMessageSerializer::new(profile.control_message_types(), profile.wire());
        let control = flag(&values, OptionKey::Control, false);
        let clipboard_autosync = flag(&values, OptionKey::ClipboardAutosync, true);
        let device =
            DeviceMessageChannel::new(profile.device_message_types(), control, clipboard_autosync);

        info!(
            "options ready for protocol {} (control={}, handlers={:?})",
            version,
            control,
            device.handlers()
        );
        Ok(Self {
            profile,
            client,
            values,
            serializer,
            device,
        })
    }

    /// Inverse of [`serialize`](Self::serialize): the non-default values in
    /// `args`, ready to pass back to [`Options::new`].
    pub fn parse_arguments<S: AsRef<str>>(
        version: ProtocolVersion,
        args: &[S],
    ) -> Result<Init, OptionsError> {
        args::parse(version, args)
    }

    pub fn version(&self) -> ProtocolVersion {
        self.profile.version()
    }

    pub fn profile(&self) -> &'static VersionProfile {
        self.profile
    }

    pub fn client_options(&self) -> &ClientOptions {
        &self.client
    }

    pub fn get(&self, key: OptionKey) -> Option<&OptionValue> {
        self.values.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Every option with its resolved value, in positional order.
    pub fn values(&self) -> &[(OptionKey, OptionValue)] {
        &self.values
    }

    /// The options whose value differs from the version default.
    pub fn non_default_values(&self) -> Init {
        let mut init = Init::new();
        for ((key, value), (_, default)) in self.values.iter().zip(self.profile.defaults()) {
            if value != default {
                init.insert(*key, value.clone());
            }
        }
        init
    }

    pub fn control(&self) -> bool {
        flag(&self.values, OptionKey::Control, false)
    }

    pub fn video_source(&self) -> VideoSource {
        self.get(OptionKey::VideoSource)
            .and_then(OptionValue::as_str)
            .and_then(VideoSource::from_name)
            .unwrap_or(VideoSource::Display)
    }

    /// `None` before audio capture existed (2.1).
    pub fn audio_source(&self) -> Option<AudioSource> {
        self.get(OptionKey::AudioSource)
            .and_then(OptionValue::as_str)
            .and_then(AudioSource::from_name)
    }

    // ── Launch arguments ──────────────────────────────────────────────────────

    /// The agent arguments for these options, in the version's style.
    pub fn serialize(&self) -> Vec<String> {
        args::serialize(self.profile.wire().arguments, &self.values, self.profile.defaults())
    }

    /// The agent version to launch: the client override or the protocol version.
    pub fn agent_version(&self) -> &str {
        self.client
            .version
            .as_deref()
            .unwrap_or(self.profile.version().as_str())
    }

    /// `[agent_version, ...serialize()]`.
    pub fn launch_arguments(&self) -> Vec<String> {
        let mut arguments = vec![self.agent_version().to_string()];
        arguments.extend(self.serialize());
        arguments
    }

    // ── Control messages ──────────────────────────────────────────────────────

    pub fn control_message_types(&self) -> &[ControlMessageType] {
        self.serializer.types()
    }

    pub fn control_message_serializer(&self) -> &ControlMessageSerializer {
        &self.serializer
    }

    /// Encodes `message`; `None` if the version or session cannot carry it.
    pub fn serialize_control_message(&self, message: &ControlMessage) -> Option<Vec<u8>> {
        if let ControlMessage::GetClipboard(m) = message {
            return self.serialize_get_clipboard_control_message(m);
        }
        self.serializer.serialize(message)
    }

    /// Unsupported when no clipboard stream exists to receive the reply.
    pub fn serialize_get_clipboard_control_message(
        &self,
        message: &GetClipboardControlMessage,
    ) -> Option<Vec<u8>> {
        if !self.device.has_clipboard_stream() {
            debug!("get-clipboard unsupported: no clipboard stream");
            return None;
        }
        self.serializer.serialize_get_clipboard(message)
    }

    /// Encodes a set-clipboard message, registering it for acknowledgement
    /// when `message.ack` is set and the session has an ack handler.
    pub fn serialize_set_clipboard_control_message(
        &mut self,
        message: &SetClipboardControlMessage,
    ) -> Option<SerializedSetClipboard> {
        // Check support before a sequence is spent.
        self.serializer.ordinal(ControlMessageType::SetClipboard)?;

        let handler = match self.device.ack_clipboard_handler() {
            Some(handler) if message.ack => handler,
            _ => {
                return self
                    .serializer
                    .serialize_set_clipboard(message, 0)
                    .map(SerializedSetClipboard::Message);
            }
        };
        let (sequence, ack) = handler.register(&message.text);
        self.serializer
            .serialize_set_clipboard(message, sequence)
            .map(|bytes| SerializedSetClipboard::AwaitingAck(bytes, ack))
    }

    /// A scroll controller for this version.
    pub fn create_scroll_controller(&self) -> ScrollController {
        self.serializer.scroll_controller()
    }

    // ── Device messages ───────────────────────────────────────────────────────

    pub fn device_message_channel(&mut self) -> &mut DeviceMessageChannel {
        &mut self.device
    }

    /// Device message types this session has handlers for.
    pub fn device_message_types(&self) -> &[DeviceMessageType] {
        self.device.handlers()
    }

    /// Dispatches one device message whose discriminant was already read.
    pub async fn parse_device_message<R>(
        &mut self,
        id: u8,
        stream: &mut R,
    ) -> Result<DeviceMessageType, DeviceMessageError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.device.parse_device_message(id, stream).await
    }

    /// Reads and dispatches device messages until the stream ends or fails.
    pub async fn pump_device_messages<R>(&mut self, stream: &mut R) -> Result<(), DeviceMessageError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.device.pump(stream).await
    }

    /// Tears down every device sub-protocol and rejects pending writes.
    pub fn end_device_message_stream(&mut self, error: Option<&dyn std::error::Error>) {
        self.device.end(error);
    }

    pub fn take_clipboard_stream(&mut self) -> Option<DeviceEventReceiver<String>> {
        self.device.take_clipboard_stream()
    }

    pub fn take_uhid_output_stream(
        &mut self,
    ) -> Option<DeviceEventReceiver<UHidOutputDeviceMessage>> {
        self.device.take_uhid_output_stream()
    }

    // ── Media ─────────────────────────────────────────────────────────────────

    /// Header and framing settings for this session's media sockets.
    pub fn media_stream_config(&self) -> MediaStreamConfig {
        let wire = self.profile.wire();
        MediaStreamConfig {
            header: wire.video_header,
            framing: wire.packet_framing,
            send_device_meta: flag(&self.values, OptionKey::SendDeviceMeta, true),
            send_codec_meta: flag(&self.values, OptionKey::SendCodecMeta, true),
            send_frame_meta: flag(&self.values, OptionKey::SendFrameMeta, true),
            video: flag(&self.values, OptionKey::Video, true),
            audio: flag(&self.values, OptionKey::Audio, false),
            video_codec: self
                .get(OptionKey::VideoCodec)
                .and_then(OptionValue::as_str)
                .and_then(VideoCodec::from_name)
                .unwrap_or(VideoCodec::H264),
            audio_codec: self
                .get(OptionKey::AudioCodec)
                .and_then(OptionValue::as_str)
                .and_then(AudioCodec::from_name)
                .unwrap_or(AudioCodec::Opus),
        }
    }

    pub async fn parse_video_stream_metadata<R>(
        &self,
        stream: R,
    ) -> Result<VideoStream<R>, MediaError>
    where
        R: AsyncRead + Unpin,
    {
        media::parse_video_stream_metadata(&self.media_stream_config(), stream).await
    }

    pub async fn parse_audio_stream_metadata<R>(
        &self,
        stream: R,
    ) -> Result<AudioStream<R>, MediaError>
    where
        R: AsyncRead + Unpin,
    {
        media::parse_audio_stream_metadata(&self.media_stream_config(), stream).await
    }

    /// A packet decoder for use with `tokio_util::codec::FramedRead`.
    pub fn create_media_stream_transformer(&self) -> MediaPacketDecoder {
        let config = self.media_stream_config();
        MediaPacketDecoder::new(config.framing, config.send_frame_meta)
    }
}

fn flag(values: &[(OptionKey, OptionValue)], key: OptionKey, fallback: bool) -> bool {
    values
        .iter()
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| v.as_bool())
        .unwrap_or(fallback)
}

/// How a rejected value is quoted in [`OptionsError::InvalidValue`].
fn describe(value: &OptionValue) -> String {
    match value {
        OptionValue::Unset => "<unset>".to_string(),
        other => other.to_option_string().unwrap_or_default(),
    }
}

fn set_value(values: &mut [(OptionKey, OptionValue)], key: OptionKey, value: OptionValue) -> bool {
    match values.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => {
            slot.1 = value;
            true
        }
        None => false,
    }
}

/// Camera sources cannot take control input; audio duplication needs the
/// playback source.
fn apply_coercions(values: &mut [(OptionKey, OptionValue)]) {
    let camera = values
        .iter()
        .any(|(k, v)| *k == OptionKey::VideoSource && v.as_str() == Some(VideoSource::Camera.as_str()));
    if camera && set_value(values, OptionKey::Control, OptionValue::Bool(false)) {
        debug!("camera video source: control forced off");
    }

    let audio_dup = flag(values, OptionKey::AudioDup, false);
    if audio_dup && set_value(values, OptionKey::AudioSource, AudioSource::Playback.into()) {
        debug!("audio_dup: audio source forced to playback");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_every_key() {
        // Act
        let options = Options::new(ProtocolVersion::V3_1, Init::new()).unwrap();

        // Assert
        assert_eq!(options.values(), ProtocolVersion::V3_1.profile().defaults());
        assert!(options.serialize().is_empty());
    }

    #[test]
    fn test_unsupported_option_is_rejected() {
        let result = Options::new(ProtocolVersion::V1_25, Init::new().audio(false));
        assert!(matches!(
            result,
            Err(OptionsError::UnsupportedOption { ref key, version: ProtocolVersion::V1_25 }) if key == "audio"
        ));
    }

    #[test]
    fn test_clearing_a_key_with_a_written_default_is_rejected() {
        // Arrange
        let init = Init::new().set(OptionKey::LogLevel, OptionValue::Unset);

        // Act
        let result = Options::new(ProtocolVersion::V3_1, init);

        // Assert
        assert_eq!(
            result.err(),
            Some(OptionsError::InvalidValue {
                key: OptionKey::LogLevel,
                value: "<unset>".to_string(),
            })
        );
        assert!(Options::new(ProtocolVersion::V3_1, Init::new().set(OptionKey::VideoCodec, "")).is_err());
    }

    #[test]
    fn test_empty_value_for_an_unset_default_stays_default() {
        // Arrange
        let init = Init::new().set(OptionKey::VideoEncoder, "");

        // Act
        let options = Options::new(ProtocolVersion::V3_1, init).unwrap();

        // Assert
        assert!(options.non_default_values().is_empty());
        assert!(options.serialize().is_empty());
    }

    #[test]
    fn test_non_finite_max_fps_is_rejected() {
        for fps in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = Options::new(ProtocolVersion::V3_1, Init::new().max_fps(fps));
            assert!(
                matches!(result, Err(OptionsError::InvalidValue { key: OptionKey::MaxFps, .. })),
                "{fps}"
            );
        }
    }

    #[test]
    fn test_misspelled_codec_is_rejected() {
        // Arrange
        let init = Init::new().set(OptionKey::VideoCodec, "h256");

        // Act
        let result = Options::new(ProtocolVersion::V3_1, init);

        // Assert
        assert_eq!(
            result.err(),
            Some(OptionsError::InvalidValue {
                key: OptionKey::VideoCodec,
                value: "h256".to_string(),
            })
        );
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let result = Options::new(
            ProtocolVersion::V3_1,
            Init::new().set(OptionKey::MaxSize, "big"),
        );
        assert!(matches!(
            result,
            Err(OptionsError::InvalidValue { key: OptionKey::MaxSize, .. })
        ));
    }

    #[test]
    fn test_camera_source_forces_control_off() {
        // Act
        let options = Options::new(
            ProtocolVersion::V2_2,
            Init::new().video_source(VideoSource::Camera).control(true),
        )
        .unwrap();

        // Assert
        assert!(!options.control());
        assert!(options.device_message_types().is_empty());
        assert_eq!(
            options.serialize(),
            vec!["control=false", "video_source=camera"]
        );
    }

    #[test]
    fn test_audio_dup_forces_playback_source() {
        // Act
        let options = Options::new(
            ProtocolVersion::V2_6,
            Init::new().audio_source(AudioSource::Mic).audio_dup(true),
        )
        .unwrap();

        // Assert
        assert_eq!(options.audio_source(), Some(AudioSource::Playback));
    }

    #[test]
    fn test_int_widens_for_float_option() {
        let options = Options::new(
            ProtocolVersion::V3_1,
            Init::new().set(OptionKey::MaxFps, 30),
        )
        .unwrap();
        assert_eq!(options.get(OptionKey::MaxFps), Some(&OptionValue::Float(30.0)));
        assert_eq!(options.serialize(), vec!["max_fps=30"]);
    }

    #[test]
    fn test_launch_arguments_lead_with_agent_version() {
        // Arrange
        let client = ClientOptions {
            version: Some("3.1-custom".to_string()),
            spawner: SpawnStrategy::Shell,
        };

        // Act
        let options = Options::with_client_options(
            ProtocolVersion::V3_1,
            Init::new().max_size(1920),
            client,
        )
        .unwrap();

        // Assert
        assert_eq!(options.launch_arguments(), vec!["3.1-custom", "max_size=1920"]);
    }

    #[test]
    fn test_agent_version_defaults_to_protocol_version() {
        let options = Options::new(ProtocolVersion::V2_0, Init::new()).unwrap();
        assert_eq!(options.agent_version(), "2.0");
    }

    #[test]
    fn test_get_clipboard_unsupported_without_clipboard_stream() {
        // Arrange
        let options = Options::new(
            ProtocolVersion::V3_1,
            Init::new().clipboard_autosync(false),
        )
        .unwrap();

        // Act
        let bytes = options.serialize_control_message(&ControlMessage::GetClipboard(
            GetClipboardControlMessage::default(),
        ));

        // Assert
        assert_eq!(bytes, None);
    }

    #[test]
    fn test_set_clipboard_is_never_acknowledged_without_autosync() {
        // Arrange
        let mut options = Options::new(
            ProtocolVersion::V3_1,
            Init::new().clipboard_autosync(false),
        )
        .unwrap();
        let message = SetClipboardControlMessage {
            text: "a".to_string(),
            paste: false,
            ack: true,
        };

        // Act
        let serialized = options.serialize_set_clipboard_control_message(&message).unwrap();

        // Assert
        assert!(options.device_message_channel().ack_clipboard_handler().is_none());
        let SerializedSetClipboard::Message(bytes) = serialized else {
            panic!("expected a plain message");
        };
        assert_eq!(bytes, vec![9, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, b'a']);
    }

    #[test]
    fn test_set_clipboard_without_ack_uses_sequence_zero() {
        // Arrange
        let mut options = Options::new(ProtocolVersion::V3_1, Init::new()).unwrap();
        let message = SetClipboardControlMessage {
            text: "a".to_string(),
            paste: false,
            ack: false,
        };

        // Act
        let serialized = options.serialize_set_clipboard_control_message(&message).unwrap();

        // Assert
        let SerializedSetClipboard::Message(bytes) = serialized else {
            panic!("expected a plain message");
        };
        assert_eq!(bytes, vec![9, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, b'a']);
    }

    #[test]
    fn test_set_clipboard_with_ack_gets_a_sequence() {
        // Arrange
        let mut options = Options::new(ProtocolVersion::V3_1, Init::new()).unwrap();
        let message = SetClipboardControlMessage {
            text: "a".to_string(),
            paste: true,
            ack: true,
        };

        // Act
        let (bytes, ack) = options
            .serialize_set_clipboard_control_message(&message)
            .unwrap()
            .into_parts();

        // Assert
        let ack = ack.unwrap();
        assert_eq!(ack.sequence(), 1);
        assert_eq!(&bytes[1..9], &1u64.to_be_bytes());
        assert_eq!(bytes[9], 1);
    }

    #[test]
    fn test_media_config_before_2_0_has_no_audio() {
        let options = Options::new(ProtocolVersion::V1_25, Init::new()).unwrap();
        let config = options.media_stream_config();
        assert!(!config.audio);
        assert!(config.video);
        assert!(config.send_device_meta);
    }

    #[test]
    fn test_init_equality_ignores_order() {
        let a = Init::new().max_size(10).control(false);
        let b = Init::new().control(false).max_size(10);
        assert_eq!(a, b);
        assert_ne!(a, Init::new().max_size(10));
    }
}
