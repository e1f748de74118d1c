//! Protocol versions and the per-version strategy table.
//!
//! # How versions are modelled (for beginners)
//!
//! The agent protocol changed a little in almost every release: an option was
//! added here, a message layout grew a field there.  Rather than one type per
//! release, each release is described by a [`VersionSpec`]: its base version
//! plus only the things it changes.  On first use the chain is walked from the
//! oldest release forwards and every version is resolved into a flat
//! [`VersionProfile`], which is cached for the life of the process.
//!
//! Everything else in the crate asks the profile: which options exist and what
//! their defaults are, which control and device message types are known (and
//! at which ordinal), and which wire layout each message uses.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use thiserror::Error;

use crate::media::{PacketFraming, VideoHeaderLayout};
use crate::options::defaults::{self, OptionChange};
use crate::options::{ArgumentStyle, OptionKey, OptionValue};
use crate::protocol::control::{
    BackOrScreenOnLayout, ControlMessageType, GetClipboardLayout, ScrollLayout,
    SetClipboardLayout, TouchLayout, UHidCreateLayout,
};
use crate::protocol::device::DeviceMessageType;

/// Errors raised while naming a protocol version.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("unknown protocol version: {0}")]
    UnknownVersion(String),
}

// ── Protocol versions ─────────────────────────────────────────────────────────

/// A supported agent protocol version.  Ordering follows release order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    V1_16,
    V1_17,
    V1_18,
    V1_19,
    V1_20,
    V1_21,
    V1_22,
    V1_23,
    V1_24,
    V1_25,
    V2_0,
    V2_1,
    V2_2,
    V2_3,
    V2_4,
    V2_5,
    V2_6,
    V2_7,
    V3_0,
    V3_1,
}

impl ProtocolVersion {
    /// Every supported version, oldest first.
    pub const ALL: [ProtocolVersion; 20] = [
        ProtocolVersion::V1_16,
        ProtocolVersion::V1_17,
        ProtocolVersion::V1_18,
        ProtocolVersion::V1_19,
        ProtocolVersion::V1_20,
        ProtocolVersion::V1_21,
        ProtocolVersion::V1_22,
        ProtocolVersion::V1_23,
        ProtocolVersion::V1_24,
        ProtocolVersion::V1_25,
        ProtocolVersion::V2_0,
        ProtocolVersion::V2_1,
        ProtocolVersion::V2_2,
        ProtocolVersion::V2_3,
        ProtocolVersion::V2_4,
        ProtocolVersion::V2_5,
        ProtocolVersion::V2_6,
        ProtocolVersion::V2_7,
        ProtocolVersion::V3_0,
        ProtocolVersion::V3_1,
    ];

    pub const LATEST: ProtocolVersion = ProtocolVersion::V3_1;

    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolVersion::V1_16 => "1.16",
            ProtocolVersion::V1_17 => "1.17",
            ProtocolVersion::V1_18 => "1.18",
            ProtocolVersion::V1_19 => "1.19",
            ProtocolVersion::V1_20 => "1.20",
            ProtocolVersion::V1_21 => "1.21",
            ProtocolVersion::V1_22 => "1.22",
            ProtocolVersion::V1_23 => "1.23",
            ProtocolVersion::V1_24 => "1.24",
            ProtocolVersion::V1_25 => "1.25",
            ProtocolVersion::V2_0 => "2.0",
            ProtocolVersion::V2_1 => "2.1",
            ProtocolVersion::V2_2 => "2.2",
            ProtocolVersion::V2_3 => "2.3",
            ProtocolVersion::V2_4 => "2.4",
            ProtocolVersion::V2_5 => "2.5",
            ProtocolVersion::V2_6 => "2.6",
            ProtocolVersion::V2_7 => "2.7",
            ProtocolVersion::V3_0 => "3.0",
            ProtocolVersion::V3_1 => "3.1",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// The release immediately before this one, if it is supported.
    pub fn predecessor(self) -> Option<ProtocolVersion> {
        self.index()
            .checked_sub(1)
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// The resolved profile for this version.
    pub fn profile(self) -> &'static VersionProfile {
        let profiles = PROFILES.get_or_init(build_profiles);
        &profiles[self.index()]
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == trimmed)
            .ok_or_else(|| VersionError::UnknownVersion(s.to_string()))
    }
}

// ── Wire layouts ──────────────────────────────────────────────────────────────

/// The layout of every version-sensitive message, resolved for one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLayout {
    pub arguments: ArgumentStyle,
    pub touch: TouchLayout,
    pub scroll: ScrollLayout,
    pub back_or_screen_on: BackOrScreenOnLayout,
    pub get_clipboard: GetClipboardLayout,
    pub set_clipboard: SetClipboardLayout,
    pub uhid_create: UHidCreateLayout,
    pub video_header: VideoHeaderLayout,
    pub packet_framing: PacketFraming,
}

const BASELINE: WireLayout = WireLayout {
    arguments: ArgumentStyle::Positional,
    touch: TouchLayout::Basic,
    scroll: ScrollLayout::IntegerSteps,
    back_or_screen_on: BackOrScreenOnLayout::DownOnly,
    get_clipboard: GetClipboardLayout::Plain,
    set_clipboard: SetClipboardLayout::Unsequenced,
    uhid_create: UHidCreateLayout::DescriptorOnly,
    video_header: VideoHeaderLayout::DeviceMeta,
    packet_framing: PacketFraming::PtsSentinel,
};

/// Layout overrides introduced by one version.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WireDelta {
    arguments: Option<ArgumentStyle>,
    touch: Option<TouchLayout>,
    scroll: Option<ScrollLayout>,
    back_or_screen_on: Option<BackOrScreenOnLayout>,
    get_clipboard: Option<GetClipboardLayout>,
    set_clipboard: Option<SetClipboardLayout>,
    uhid_create: Option<UHidCreateLayout>,
    video_header: Option<VideoHeaderLayout>,
    packet_framing: Option<PacketFraming>,
}

impl WireDelta {
    const INHERIT: WireDelta = WireDelta {
        arguments: None,
        touch: None,
        scroll: None,
        back_or_screen_on: None,
        get_clipboard: None,
        set_clipboard: None,
        uhid_create: None,
        video_header: None,
        packet_framing: None,
    };
}

impl WireLayout {
    fn apply(mut self, delta: &WireDelta) -> WireLayout {
        if let Some(arguments) = delta.arguments {
            self.arguments = arguments;
        }
        if let Some(touch) = delta.touch {
            self.touch = touch;
        }
        if let Some(scroll) = delta.scroll {
            self.scroll = scroll;
        }
        if let Some(back_or_screen_on) = delta.back_or_screen_on {
            self.back_or_screen_on = back_or_screen_on;
        }
        if let Some(get_clipboard) = delta.get_clipboard {
            self.get_clipboard = get_clipboard;
        }
        if let Some(set_clipboard) = delta.set_clipboard {
            self.set_clipboard = set_clipboard;
        }
        if let Some(uhid_create) = delta.uhid_create {
            self.uhid_create = uhid_create;
        }
        if let Some(video_header) = delta.video_header {
            self.video_header = video_header;
        }
        if let Some(packet_framing) = delta.packet_framing {
            self.packet_framing = packet_framing;
        }
        self
    }
}

// ── Version strategy table ────────────────────────────────────────────────────

/// What one version changes relative to its base.
pub(crate) struct VersionSpec {
    pub(crate) version: ProtocolVersion,
    pub(crate) base: Option<ProtocolVersion>,
    options: &'static [OptionChange],
    control_types: &'static [ControlMessageType],
    device_types: &'static [DeviceMessageType],
    wire: WireDelta,
}

impl VersionSpec {
    const fn unchanged(version: ProtocolVersion, base: ProtocolVersion) -> VersionSpec {
        VersionSpec {
            version,
            base: Some(base),
            options: defaults::UNCHANGED,
            control_types: &[],
            device_types: &[],
            wire: WireDelta::INHERIT,
        }
    }
}

use ControlMessageType as C;
use ProtocolVersion as V;

pub(crate) static SPECS: [VersionSpec; 20] = [
    VersionSpec {
        version: V::V1_16,
        base: None,
        options: defaults::V1_16,
        control_types: &[
            C::InjectKeyCode,
            C::InjectText,
            C::InjectTouch,
            C::InjectScroll,
            C::BackOrScreenOn,
            C::ExpandNotificationPanel,
            C::ExpandSettingsPanel,
            C::CollapsePanels,
            C::GetClipboard,
            C::SetClipboard,
            C::SetScreenPowerMode,
            C::RotateDevice,
        ],
        device_types: &[DeviceMessageType::Clipboard],
        wire: WireDelta::INHERIT,
    },
    VersionSpec {
        version: V::V1_17,
        base: Some(V::V1_16),
        options: defaults::V1_17,
        control_types: &[],
        device_types: &[],
        wire: WireDelta::INHERIT,
    },
    VersionSpec {
        version: V::V1_18,
        base: Some(V::V1_17),
        options: defaults::V1_18,
        control_types: &[],
        device_types: &[],
        wire: WireDelta {
            back_or_screen_on: Some(BackOrScreenOnLayout::WithAction),
            ..WireDelta::INHERIT
        },
    },
    VersionSpec::unchanged(V::V1_19, V::V1_18),
    VersionSpec::unchanged(V::V1_20, V::V1_19),
    VersionSpec {
        version: V::V1_21,
        base: Some(V::V1_20),
        options: defaults::V1_21,
        control_types: &[],
        device_types: &[DeviceMessageType::AckClipboard],
        wire: WireDelta {
            arguments: Some(ArgumentStyle::KeyValue),
            set_clipboard: Some(SetClipboardLayout::Sequenced),
            ..WireDelta::INHERIT
        },
    },
    VersionSpec {
        version: V::V1_22,
        base: Some(V::V1_21),
        options: defaults::V1_22,
        control_types: &[],
        device_types: &[],
        wire: WireDelta {
            scroll: Some(ScrollLayout::IntegerStepsWithButtons),
            ..WireDelta::INHERIT
        },
    },
    VersionSpec {
        version: V::V1_23,
        base: Some(V::V1_22),
        options: defaults::V1_23,
        control_types: &[],
        device_types: &[],
        wire: WireDelta::INHERIT,
    },
    VersionSpec {
        version: V::V1_24,
        base: Some(V::V1_23),
        options: defaults::V1_24,
        control_types: &[],
        device_types: &[],
        wire: WireDelta::INHERIT,
    },
    VersionSpec {
        version: V::V1_25,
        base: Some(V::V1_24),
        options: defaults::UNCHANGED,
        control_types: &[],
        device_types: &[],
        wire: WireDelta {
            scroll: Some(ScrollLayout::FixedPoint),
            ..WireDelta::INHERIT
        },
    },
    VersionSpec {
        version: V::V2_0,
        base: Some(V::V1_25),
        options: defaults::V2_0,
        control_types: &[],
        device_types: &[],
        wire: WireDelta {
            touch: Some(TouchLayout::WithActionButton),
            get_clipboard: Some(GetClipboardLayout::WithCopyKey),
            video_header: Some(VideoHeaderLayout::CodecMeta),
            packet_framing: Some(PacketFraming::Flagged),
            ..WireDelta::INHERIT
        },
    },
    VersionSpec {
        version: V::V2_1,
        base: Some(V::V2_0),
        options: defaults::V2_1,
        control_types: &[],
        device_types: &[],
        wire: WireDelta::INHERIT,
    },
    VersionSpec {
        version: V::V2_2,
        base: Some(V::V2_1),
        options: defaults::V2_2,
        control_types: &[],
        device_types: &[],
        wire: WireDelta::INHERIT,
    },
    VersionSpec::unchanged(V::V2_3, V::V2_2),
    VersionSpec {
        version: V::V2_4,
        base: Some(V::V2_3),
        options: defaults::UNCHANGED,
        control_types: &[C::UHidCreate, C::UHidInput],
        device_types: &[DeviceMessageType::UHidOutput],
        wire: WireDelta::INHERIT,
    },
    VersionSpec::unchanged(V::V2_5, V::V2_4),
    VersionSpec {
        version: V::V2_6,
        base: Some(V::V2_5),
        options: defaults::V2_6,
        control_types: &[C::UHidDestroy, C::OpenHardKeyboardSettings],
        device_types: &[],
        wire: WireDelta {
            uhid_create: Some(UHidCreateLayout::Named),
            ..WireDelta::INHERIT
        },
    },
    VersionSpec {
        version: V::V2_7,
        base: Some(V::V2_6),
        options: defaults::V2_7,
        control_types: &[],
        device_types: &[],
        wire: WireDelta::INHERIT,
    },
    VersionSpec {
        version: V::V3_0,
        base: Some(V::V2_7),
        options: defaults::V3_0,
        control_types: &[C::StartApp, C::ResetVideo],
        device_types: &[],
        wire: WireDelta::INHERIT,
    },
    VersionSpec {
        version: V::V3_1,
        base: Some(V::V3_0),
        options: defaults::V3_1,
        control_types: &[],
        device_types: &[],
        wire: WireDelta::INHERIT,
    },
];

// ── Resolved profiles ─────────────────────────────────────────────────────────

/// Everything one protocol version supports, fully resolved.
#[derive(Debug, Clone)]
pub struct VersionProfile {
    version: ProtocolVersion,
    defaults: Vec<(OptionKey, OptionValue)>,
    control_types: Vec<ControlMessageType>,
    device_types: Vec<DeviceMessageType>,
    wire: WireLayout,
}

impl VersionProfile {
    fn empty(version: ProtocolVersion) -> VersionProfile {
        VersionProfile {
            version,
            defaults: Vec::new(),
            control_types: Vec::new(),
            device_types: Vec::new(),
            wire: BASELINE,
        }
    }

    fn derive(&self, spec: &VersionSpec) -> VersionProfile {
        let mut defaults = self.defaults.clone();
        defaults::apply(&mut defaults, spec.options);

        let mut control_types = self.control_types.clone();
        control_types.extend_from_slice(spec.control_types);

        let mut device_types = self.device_types.clone();
        device_types.extend_from_slice(spec.device_types);

        VersionProfile {
            version: spec.version,
            defaults,
            control_types,
            device_types,
            wire: self.wire.apply(&spec.wire),
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Option defaults, in positional argument order.
    pub fn defaults(&self) -> &[(OptionKey, OptionValue)] {
        &self.defaults
    }

    pub fn default_value(&self, key: OptionKey) -> Option<&OptionValue> {
        self.defaults
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn supports_option(&self, key: OptionKey) -> bool {
        self.default_value(key).is_some()
    }

    /// Control message types; a type's index is its wire ordinal.
    pub fn control_message_types(&self) -> &[ControlMessageType] {
        &self.control_types
    }

    /// Device message types the agent may send, in registration order.
    pub fn device_message_types(&self) -> &[DeviceMessageType] {
        &self.device_types
    }

    pub fn wire(&self) -> WireLayout {
        self.wire
    }
}

static PROFILES: OnceLock<Vec<VersionProfile>> = OnceLock::new();

fn build_profiles() -> Vec<VersionProfile> {
    let mut profiles: Vec<VersionProfile> = Vec::with_capacity(SPECS.len());
    for spec in SPECS.iter() {
        let resolved = match spec.base.and_then(|base| profiles.get(base.index())) {
            Some(base) => base.derive(spec),
            None => VersionProfile::empty(spec.version).derive(spec),
        };
        profiles.push(resolved);
    }
    profiles
}
