//! # scrcpy-core
//!
//! Versioned protocol engine for driving a scrcpy agent on an Android device:
//! launch options, control messages, device messages and media stream
//! framing, for every supported protocol release.
//!
//! The crate performs no process spawning and owns no sockets.  Callers hand
//! it byte streams (`tokio::io::AsyncRead`) and write the byte buffers it
//! produces to the control socket themselves.
//!
//! # Architecture overview (for beginners)
//!
//! A scrcpy session talks to a small agent running on the device.  The host
//! launches the agent with a list of options, then opens up to three sockets:
//! video, audio and control.  The wire format of almost every piece of that
//! conversation drifted from release to release, so the crate is organised
//! around a per-version strategy table:
//!
//! - **`version`** – The supported releases and, for each one, a resolved
//!   `VersionProfile`: option defaults, message ordinal tables and the wire
//!   layout of every message that changed shape.
//!
//! - **`options`** – The option matrix.  `Options` is the session entry
//!   point: built from a version and a partial `Init`, it produces the launch
//!   arguments and owns the session's protocol handlers.
//!
//! - **`protocol`** – Control messages (host to agent) and device messages
//!   (agent to host), including the clipboard acknowledgement sub-protocol and
//!   the scroll accumulator.
//!
//! - **`media`** – Parsing of the video and audio stream headers and a
//!   `tokio_util` decoder that splits the streams into packets.
//!
//! - **`config`** – TOML session profiles for storing option presets.

pub mod config;
pub mod media;
pub mod options;
pub mod protocol;
pub mod version;

// Re-export the most-used types at the crate root so callers can write
// `scrcpy_core::Options` instead of `scrcpy_core::options::Options`.
pub use config::{ConfigError, SessionProfile};
pub use media::{
    AudioStream, MediaError, MediaPacketDecoder, MediaStreamConfig, MediaStreamPacket,
    VideoStream, VideoStreamMetadata,
};
pub use options::{
    ClientOptions, Init, OptionKey, OptionValue, Options, OptionsError, SpawnStrategy,
};
pub use protocol::{
    ChannelClosed, ClipboardAck, ControlMessage, ControlMessageSerializer, ControlMessageType,
    DeviceMessageChannel, DeviceMessageError, DeviceMessageType, ScrollController,
    SerializedSetClipboard,
};
pub use version::{ProtocolVersion, VersionError, VersionProfile};
