//! Option keys, value kinds and typed helpers for agent launch options.
//!
//! Every option the agent understands is a variant of [`OptionKey`].  The key
//! carries its wire name (the `snake_case` token written on the agent command
//! line) and its [`OptionKind`], which decides how a value is validated,
//! written and parsed back.
//!
//! Values are stored as [`OptionValue`].  The enum is deliberately small: the
//! agent only ever sees strings, so anything richer (codec enums, crop
//! rectangles, codec option lists) converts *into* an `OptionValue` through
//! `From` impls defined here.

use std::borrow::Cow;
use std::fmt;

// ── Option keys ───────────────────────────────────────────────────────────────

/// Every launch option known to any supported protocol version.
///
/// Which keys a particular version accepts is decided by that version's
/// defaults table, not by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    LogLevel,
    MaxSize,
    BitRate,
    MaxFps,
    LockVideoOrientation,
    TunnelForward,
    Crop,
    SendFrameMeta,
    Control,
    DisplayId,
    ShowTouches,
    StayAwake,
    CodecOptions,
    EncoderName,
    PowerOffOnClose,
    ClipboardAutosync,
    DownsizeOnError,
    SendDeviceMeta,
    SendDummyByte,
    Cleanup,
    PowerOn,
    Scid,
    VideoCodec,
    VideoBitRate,
    VideoCodecOptions,
    VideoEncoder,
    Audio,
    AudioCodec,
    AudioBitRate,
    AudioCodecOptions,
    AudioEncoder,
    ListEncoders,
    ListDisplays,
    SendCodecMeta,
    Video,
    AudioSource,
    VideoSource,
    CameraId,
    CameraSize,
    CameraFacing,
    CameraAr,
    CameraFps,
    CameraHighSpeed,
    ListCameras,
    ListCameraSizes,
    AudioDup,
    ScreenOffTimeout,
    ListApps,
    CaptureOrientation,
    Angle,
    NewDisplay,
    VdSystemDecorations,
    VdDestroyContent,
}

impl OptionKey {
    /// All keys, in declaration order.
    pub const ALL: &'static [OptionKey] = &[
        OptionKey::LogLevel,
        OptionKey::MaxSize,
        OptionKey::BitRate,
        OptionKey::MaxFps,
        OptionKey::LockVideoOrientation,
        OptionKey::TunnelForward,
        OptionKey::Crop,
        OptionKey::SendFrameMeta,
        OptionKey::Control,
        OptionKey::DisplayId,
        OptionKey::ShowTouches,
        OptionKey::StayAwake,
        OptionKey::CodecOptions,
        OptionKey::EncoderName,
        OptionKey::PowerOffOnClose,
        OptionKey::ClipboardAutosync,
        OptionKey::DownsizeOnError,
        OptionKey::SendDeviceMeta,
        OptionKey::SendDummyByte,
        OptionKey::Cleanup,
        OptionKey::PowerOn,
        OptionKey::Scid,
        OptionKey::VideoCodec,
        OptionKey::VideoBitRate,
        OptionKey::VideoCodecOptions,
        OptionKey::VideoEncoder,
        OptionKey::Audio,
        OptionKey::AudioCodec,
        OptionKey::AudioBitRate,
        OptionKey::AudioCodecOptions,
        OptionKey::AudioEncoder,
        OptionKey::ListEncoders,
        OptionKey::ListDisplays,
        OptionKey::SendCodecMeta,
        OptionKey::Video,
        OptionKey::AudioSource,
        OptionKey::VideoSource,
        OptionKey::CameraId,
        OptionKey::CameraSize,
        OptionKey::CameraFacing,
        OptionKey::CameraAr,
        OptionKey::CameraFps,
        OptionKey::CameraHighSpeed,
        OptionKey::ListCameras,
        OptionKey::ListCameraSizes,
        OptionKey::AudioDup,
        OptionKey::ScreenOffTimeout,
        OptionKey::ListApps,
        OptionKey::CaptureOrientation,
        OptionKey::Angle,
        OptionKey::NewDisplay,
        OptionKey::VdSystemDecorations,
        OptionKey::VdDestroyContent,
    ];

    /// The token used on the agent command line.
    pub fn as_str(self) -> &'static str {
        match self {
            OptionKey::LogLevel => "log_level",
            OptionKey::MaxSize => "max_size",
            OptionKey::BitRate => "bit_rate",
            OptionKey::MaxFps => "max_fps",
            OptionKey::LockVideoOrientation => "lock_video_orientation",
            OptionKey::TunnelForward => "tunnel_forward",
            OptionKey::Crop => "crop",
            OptionKey::SendFrameMeta => "send_frame_meta",
            OptionKey::Control => "control",
            OptionKey::DisplayId => "display_id",
            OptionKey::ShowTouches => "show_touches",
            OptionKey::StayAwake => "stay_awake",
            OptionKey::CodecOptions => "codec_options",
            OptionKey::EncoderName => "encoder_name",
            OptionKey::PowerOffOnClose => "power_off_on_close",
            OptionKey::ClipboardAutosync => "clipboard_autosync",
            OptionKey::DownsizeOnError => "downsize_on_error",
            OptionKey::SendDeviceMeta => "send_device_meta",
            OptionKey::SendDummyByte => "send_dummy_byte",
            OptionKey::Cleanup => "cleanup",
            OptionKey::PowerOn => "power_on",
            OptionKey::Scid => "scid",
            OptionKey::VideoCodec => "video_codec",
            OptionKey::VideoBitRate => "video_bit_rate",
            OptionKey::VideoCodecOptions => "video_codec_options",
            OptionKey::VideoEncoder => "video_encoder",
            OptionKey::Audio => "audio",
            OptionKey::AudioCodec => "audio_codec",
            OptionKey::AudioBitRate => "audio_bit_rate",
            OptionKey::AudioCodecOptions => "audio_codec_options",
            OptionKey::AudioEncoder => "audio_encoder",
            OptionKey::ListEncoders => "list_encoders",
            OptionKey::ListDisplays => "list_displays",
            OptionKey::SendCodecMeta => "send_codec_meta",
            OptionKey::Video => "video",
            OptionKey::AudioSource => "audio_source",
            OptionKey::VideoSource => "video_source",
            OptionKey::CameraId => "camera_id",
            OptionKey::CameraSize => "camera_size",
            OptionKey::CameraFacing => "camera_facing",
            OptionKey::CameraAr => "camera_ar",
            OptionKey::CameraFps => "camera_fps",
            OptionKey::CameraHighSpeed => "camera_high_speed",
            OptionKey::ListCameras => "list_cameras",
            OptionKey::ListCameraSizes => "list_camera_sizes",
            OptionKey::AudioDup => "audio_dup",
            OptionKey::ScreenOffTimeout => "screen_off_timeout",
            OptionKey::ListApps => "list_apps",
            OptionKey::CaptureOrientation => "capture_orientation",
            OptionKey::Angle => "angle",
            OptionKey::NewDisplay => "new_display",
            OptionKey::VdSystemDecorations => "vd_system_decorations",
            OptionKey::VdDestroyContent => "vd_destroy_content",
        }
    }

    /// Looks a key up by its command-line token.
    pub fn from_wire_name(name: &str) -> Option<OptionKey> {
        Self::ALL.iter().copied().find(|key| key.as_str() == name)
    }

    /// Whether `value`, already coerced to [`kind`](Self::kind), is legal.
    ///
    /// Keys backed by a named enum only take that enum's spellings; an empty
    /// string is left to the caller, which treats it as "no value".
    pub fn accepts(self, value: &OptionValue) -> bool {
        let Some(name) = value.as_str().filter(|name| !name.is_empty()) else {
            return true;
        };
        match self {
            OptionKey::LogLevel => LogLevel::from_name(name).is_some(),
            OptionKey::VideoCodec => VideoCodec::from_name(name).is_some(),
            OptionKey::AudioCodec => AudioCodec::from_name(name).is_some(),
            OptionKey::VideoSource => VideoSource::from_name(name).is_some(),
            OptionKey::AudioSource => AudioSource::from_name(name).is_some(),
            OptionKey::CameraFacing => CameraFacing::from_name(name).is_some(),
            _ => true,
        }
    }

    /// The kind of value this key accepts.
    pub fn kind(self) -> OptionKind {
        match self {
            OptionKey::LogLevel
            | OptionKey::Crop
            | OptionKey::CodecOptions
            | OptionKey::EncoderName
            | OptionKey::Scid
            | OptionKey::VideoCodec
            | OptionKey::VideoCodecOptions
            | OptionKey::VideoEncoder
            | OptionKey::AudioCodec
            | OptionKey::AudioCodecOptions
            | OptionKey::AudioEncoder
            | OptionKey::AudioSource
            | OptionKey::VideoSource
            | OptionKey::CameraId
            | OptionKey::CameraSize
            | OptionKey::CameraFacing
            | OptionKey::CameraAr
            | OptionKey::CaptureOrientation
            | OptionKey::NewDisplay => OptionKind::Str,

            OptionKey::MaxSize
            | OptionKey::BitRate
            | OptionKey::LockVideoOrientation
            | OptionKey::DisplayId
            | OptionKey::VideoBitRate
            | OptionKey::AudioBitRate
            | OptionKey::CameraFps
            | OptionKey::ScreenOffTimeout => OptionKind::Int,

            OptionKey::MaxFps | OptionKey::Angle => OptionKind::Float,

            _ => OptionKind::Bool,
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of value an [`OptionKey`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Int,
    Float,
    Str,
}

// ── Option values ─────────────────────────────────────────────────────────────

/// A single launch option value.
///
/// `Unset` is the "no value" state (the agent picks its own behaviour); it is
/// never written in `key=value` style and becomes `-` in positional style.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Unset,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Cow<'static, str>),
}

impl OptionValue {
    /// Builds a string value from a static string; usable in `static` tables.
    pub const fn text(value: &'static str) -> Self {
        OptionValue::Str(Cow::Borrowed(value))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            OptionValue::Float(v) => Some(*v),
            OptionValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, OptionValue::Unset)
    }

    /// Normalises `self` for a key of `kind`.
    ///
    /// Integers are widened to floats for float keys; any other mismatch
    /// returns `None`, as do NaN and infinities.  `Unset` is valid for every
    /// kind.
    pub fn coerce(self, kind: OptionKind) -> Option<OptionValue> {
        match (kind, self) {
            (_, OptionValue::Unset) => Some(OptionValue::Unset),
            (OptionKind::Bool, v @ OptionValue::Bool(_)) => Some(v),
            (OptionKind::Int, v @ OptionValue::Int(_)) => Some(v),
            (OptionKind::Float, OptionValue::Float(v)) if v.is_finite() => {
                Some(OptionValue::Float(v))
            }
            (OptionKind::Float, OptionValue::Int(i)) => Some(OptionValue::Float(i as f64)),
            (OptionKind::Str, v @ OptionValue::Str(_)) => Some(v),
            _ => None,
        }
    }

    /// The string the agent sees, or `None` when nothing should be written.
    ///
    /// Empty strings count as "nothing".  Integral floats are written without
    /// a fractional part (`60`, not `60.0`).
    pub fn to_option_string(&self) -> Option<String> {
        match self {
            OptionValue::Unset => None,
            OptionValue::Bool(b) => Some(b.to_string()),
            OptionValue::Int(i) => Some(i.to_string()),
            OptionValue::Float(v) => Some(v.to_string()),
            OptionValue::Str(s) if s.is_empty() => None,
            OptionValue::Str(s) => Some(s.to_string()),
        }
    }

    /// Parses a command-line token back into a value of `kind`.
    pub fn parse(kind: OptionKind, raw: &str) -> Option<OptionValue> {
        match kind {
            OptionKind::Bool => match raw {
                "true" => Some(OptionValue::Bool(true)),
                "false" => Some(OptionValue::Bool(false)),
                _ => None,
            },
            OptionKind::Int => raw.parse().ok().map(OptionValue::Int),
            OptionKind::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(OptionValue::Float),
            OptionKind::Str => Some(OptionValue::Str(Cow::Owned(raw.to_string()))),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Int(value.into())
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::Int(value.into())
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(Cow::Owned(value.to_string()))
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(Cow::Owned(value))
    }
}

// ── Typed option enums ────────────────────────────────────────────────────────

macro_rules! named_option_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// The value as written on the agent command line.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Parses the command-line spelling.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl From<$name> for OptionValue {
            fn from(value: $name) -> Self {
                OptionValue::text(value.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_option_enum! {
    /// Agent-side log verbosity.
    pub enum LogLevel {
        Verbose => "verbose",
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Error => "error",
    }
}

named_option_enum! {
    /// Video codec requested from (or reported by) the agent.
    pub enum VideoCodec {
        H264 => "h264",
        H265 => "h265",
        Av1 => "av1",
    }
}

named_option_enum! {
    /// Audio codec requested from (or reported by) the agent.
    pub enum AudioCodec {
        Opus => "opus",
        Aac => "aac",
        Flac => "flac",
        Raw => "raw",
    }
}

named_option_enum! {
    /// What the agent captures video from.
    pub enum VideoSource {
        Display => "display",
        Camera => "camera",
    }
}

named_option_enum! {
    /// What the agent captures audio from.
    pub enum AudioSource {
        Output => "output",
        Mic => "mic",
        Playback => "playback",
        MicUnprocessed => "mic-unprocessed",
        MicCamcorder => "mic-camcorder",
        MicVoiceRecognition => "mic-voice-recognition",
        MicVoiceCommunication => "mic-voice-communication",
        VoiceCall => "voice-call",
        VoiceCallUplink => "voice-call-uplink",
        VoiceCallDownlink => "voice-call-downlink",
        VoicePerformance => "voice-performance",
    }
}

named_option_enum! {
    /// Camera lens selection for camera video sources.
    pub enum CameraFacing {
        Front => "front",
        Back => "back",
        External => "external",
    }
}

impl VideoCodec {
    /// The 4-byte codec identifier used in stream headers (ASCII, big-endian).
    pub fn codec_id(self) -> u32 {
        match self {
            VideoCodec::H264 => 0x6832_3634,
            VideoCodec::H265 => 0x6832_3635,
            VideoCodec::Av1 => 0x0061_7631,
        }
    }

    pub fn from_codec_id(id: u32) -> Option<Self> {
        match id {
            0x6832_3634 => Some(VideoCodec::H264),
            0x6832_3635 => Some(VideoCodec::H265),
            0x0061_7631 => Some(VideoCodec::Av1),
            _ => None,
        }
    }
}

impl AudioCodec {
    /// The 4-byte codec identifier used in stream headers (ASCII, big-endian).
    pub fn codec_id(self) -> u32 {
        match self {
            AudioCodec::Opus => 0x6f70_7573,
            AudioCodec::Aac => 0x0061_6163,
            AudioCodec::Flac => 0x666c_6163,
            AudioCodec::Raw => 0x0072_6177,
        }
    }

    pub fn from_codec_id(id: u32) -> Option<Self> {
        match id {
            0x6f70_7573 => Some(AudioCodec::Opus),
            0x0061_6163 => Some(AudioCodec::Aac),
            0x666c_6163 => Some(AudioCodec::Flac),
            0x0072_6177 => Some(AudioCodec::Raw),
            _ => None,
        }
    }
}

// ── Structured string options ─────────────────────────────────────────────────

/// A capture crop rectangle, written as `width:height:x:y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl From<Crop> for OptionValue {
    fn from(crop: Crop) -> Self {
        OptionValue::from(format!(
            "{}:{}:{}:{}",
            crop.width, crop.height, crop.x, crop.y
        ))
    }
}

/// Encoder options passed through to the device's `MediaFormat`.
///
/// Written as `key=value` pairs joined by commas, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecOptions {
    entries: Vec<(String, String)>,
}

impl CodecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one encoder option.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<CodecOptions> for OptionValue {
    fn from(options: CodecOptions) -> Self {
        if options.is_empty() {
            return OptionValue::Unset;
        }
        let joined = options
            .entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        OptionValue::from(joined)
    }
}
