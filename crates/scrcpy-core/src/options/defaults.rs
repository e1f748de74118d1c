//! Per-version launch option deltas.
//!
//! Each table lists only what a version changes relative to its base.  The
//! resolved defaults for a version are produced by
//! [`crate::version::VersionProfile`], which walks the base chain once and
//! caches the result.  Positional argument order is the order keys appear
//! after resolution, so 1.16's table opens the positional layout and 1.17
//! and 1.18 each append one argument.

use super::value::{OptionKey, OptionValue};

/// One change to the inherited defaults table.
#[derive(Debug, Clone)]
pub(crate) enum OptionChange {
    /// Appends `key` with a default, or replaces the default if inherited.
    Add(OptionKey, OptionValue),
    /// Drops an inherited key.
    Remove(OptionKey),
}

use OptionChange::{Add, Remove};

pub(crate) const V1_16: &[OptionChange] = &[
    Add(OptionKey::LogLevel, OptionValue::text("info")),
    Add(OptionKey::MaxSize, OptionValue::Int(0)),
    Add(OptionKey::BitRate, OptionValue::Int(8_000_000)),
    Add(OptionKey::MaxFps, OptionValue::Float(0.0)),
    Add(OptionKey::LockVideoOrientation, OptionValue::Int(-1)),
    Add(OptionKey::TunnelForward, OptionValue::Bool(false)),
    Add(OptionKey::Crop, OptionValue::Unset),
    Add(OptionKey::SendFrameMeta, OptionValue::Bool(true)),
    Add(OptionKey::Control, OptionValue::Bool(true)),
    Add(OptionKey::DisplayId, OptionValue::Int(0)),
    Add(OptionKey::ShowTouches, OptionValue::Bool(false)),
    Add(OptionKey::StayAwake, OptionValue::Bool(false)),
    Add(OptionKey::CodecOptions, OptionValue::Unset),
];

pub(crate) const V1_17: &[OptionChange] = &[Add(OptionKey::EncoderName, OptionValue::Unset)];

pub(crate) const V1_18: &[OptionChange] = &[Add(OptionKey::PowerOffOnClose, OptionValue::Bool(false))];

pub(crate) const V1_21: &[OptionChange] = &[Add(OptionKey::ClipboardAutosync, OptionValue::Bool(true))];

pub(crate) const V1_22: &[OptionChange] = &[
    Add(OptionKey::DownsizeOnError, OptionValue::Bool(true)),
    Add(OptionKey::SendDeviceMeta, OptionValue::Bool(true)),
    Add(OptionKey::SendDummyByte, OptionValue::Bool(true)),
];

pub(crate) const V1_23: &[OptionChange] = &[Add(OptionKey::Cleanup, OptionValue::Bool(true))];

pub(crate) const V1_24: &[OptionChange] = &[Add(OptionKey::PowerOn, OptionValue::Bool(true))];

pub(crate) const V2_0: &[OptionChange] = &[
    Remove(OptionKey::BitRate),
    Remove(OptionKey::CodecOptions),
    Remove(OptionKey::EncoderName),
    Add(OptionKey::Scid, OptionValue::Unset),
    Add(OptionKey::VideoCodec, OptionValue::text("h264")),
    Add(OptionKey::VideoBitRate, OptionValue::Int(8_000_000)),
    Add(OptionKey::VideoCodecOptions, OptionValue::Unset),
    Add(OptionKey::VideoEncoder, OptionValue::Unset),
    Add(OptionKey::Audio, OptionValue::Bool(true)),
    Add(OptionKey::AudioCodec, OptionValue::text("opus")),
    Add(OptionKey::AudioBitRate, OptionValue::Int(128_000)),
    Add(OptionKey::AudioCodecOptions, OptionValue::Unset),
    Add(OptionKey::AudioEncoder, OptionValue::Unset),
    Add(OptionKey::ListEncoders, OptionValue::Bool(false)),
    Add(OptionKey::ListDisplays, OptionValue::Bool(false)),
    Add(OptionKey::SendCodecMeta, OptionValue::Bool(true)),
];

pub(crate) const V2_1: &[OptionChange] = &[
    Add(OptionKey::Video, OptionValue::Bool(true)),
    Add(OptionKey::AudioSource, OptionValue::text("output")),
];

pub(crate) const V2_2: &[OptionChange] = &[
    Add(OptionKey::VideoSource, OptionValue::text("display")),
    Add(OptionKey::CameraId, OptionValue::Unset),
    Add(OptionKey::CameraSize, OptionValue::Unset),
    Add(OptionKey::CameraFacing, OptionValue::Unset),
    Add(OptionKey::CameraAr, OptionValue::Unset),
    Add(OptionKey::CameraFps, OptionValue::Unset),
    Add(OptionKey::CameraHighSpeed, OptionValue::Bool(false)),
    Add(OptionKey::ListCameras, OptionValue::Bool(false)),
    Add(OptionKey::ListCameraSizes, OptionValue::Bool(false)),
];

pub(crate) const V2_6: &[OptionChange] = &[Add(OptionKey::AudioDup, OptionValue::Bool(false))];

pub(crate) const V2_7: &[OptionChange] = &[
    Add(OptionKey::ScreenOffTimeout, OptionValue::Int(-1)),
    Add(OptionKey::ListApps, OptionValue::Bool(false)),
];

pub(crate) const V3_0: &[OptionChange] = &[
    Remove(OptionKey::LockVideoOrientation),
    Add(OptionKey::CaptureOrientation, OptionValue::Unset),
    Add(OptionKey::Angle, OptionValue::Float(0.0)),
    Add(OptionKey::NewDisplay, OptionValue::Unset),
    Add(OptionKey::VdSystemDecorations, OptionValue::Bool(true)),
];

pub(crate) const V3_1: &[OptionChange] = &[Add(OptionKey::VdDestroyContent, OptionValue::Bool(true))];

pub(crate) const UNCHANGED: &[OptionChange] = &[];

/// Applies `changes` to an inherited defaults table in place.
pub(crate) fn apply(defaults: &mut Vec<(OptionKey, OptionValue)>, changes: &[OptionChange]) {
    for change in changes {
        match change {
            Add(key, value) => match defaults.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value.clone(),
                None => defaults.push((*key, value.clone())),
            },
            Remove(key) => defaults.retain(|(k, _)| k != key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_default_matches_its_key_kind() {
        // Arrange
        let tables = [
            V1_16, V1_17, V1_18, V1_21, V1_22, V1_23, V1_24, V2_0, V2_1, V2_2, V2_6, V2_7, V3_0, V3_1,
        ];

        // Act / Assert
        for change in tables.iter().flat_map(|t| t.iter()) {
            if let Add(key, value) = change {
                assert!(
                    value.clone().coerce(key.kind()).as_ref() == Some(value) && key.accepts(value),
                    "default for {key} does not match its kind"
                );
            }
        }
    }

    #[test]
    fn test_apply_replaces_in_place_and_removes() {
        // Arrange
        let mut defaults = Vec::new();
        apply(&mut defaults, V1_16);

        // Act
        apply(
            &mut defaults,
            &[
                Add(OptionKey::MaxSize, OptionValue::Int(1024)),
                Remove(OptionKey::BitRate),
            ],
        );

        // Assert
        assert_eq!(defaults[1], (OptionKey::MaxSize, OptionValue::Int(1024)));
        assert!(defaults.iter().all(|(k, _)| *k != OptionKey::BitRate));
        assert_eq!(defaults.len(), V1_16.len() - 1);
    }
}
