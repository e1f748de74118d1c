//! TOML session profiles.
//!
//! A session profile stores the protocol version, the host-side client
//! settings and the launch options for one session, so a tool can keep named
//! presets as text instead of rebuilding an [`Init`] by hand each time.
//! Reading and writing the text is left to the caller.
//!
//! # What is TOML? (for beginners)
//!
//! TOML is a small configuration format made of `key = value` lines grouped
//! under `[section]` headers.  A profile looks like this:
//!
//! ```toml
//! version = "3.1"
//!
//! [client]
//! agent_version = "3.1"
//! spawner = "shell"
//!
//! [options]
//! max_size = 1920
//! video_codec = "h265"
//! audio = false
//! ```
//!
//! Every section is optional.  A missing `version` means the latest supported
//! protocol; a missing `[options]` table means "all defaults".  Option names
//! are the agent's own wire names, and each value must have the kind the
//! option expects (a number where a number is expected, and so on).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::options::{
    ClientOptions, Init, OptionKey, OptionValue, Options, OptionsError, SpawnStrategy,
};
use crate::version::{ProtocolVersion, VersionError};

/// Errors that can occur while parsing or converting a session profile.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("unknown option `{0}` in session profile")]
    UnknownOption(String),

    #[error(transparent)]
    Options(#[from] OptionsError),
}

// ── Profile structs ───────────────────────────────────────────────────────────

/// Host-side settings that never reach the agent as options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSection {
    /// Agent version to launch; the protocol version when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,

    #[serde(default)]
    pub spawner: SpawnStrategy,
}

/// A stored session: protocol version, client settings and launch options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProfile {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub client: ClientSection,

    /// Launch options keyed by wire name; only non-default values need be listed.
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

fn default_version() -> String {
    ProtocolVersion::LATEST.as_str().to_string()
}

impl Default for SessionProfile {
    fn default() -> Self {
        Self {
            version: default_version(),
            client: ClientSection::default(),
            options: BTreeMap::new(),
        }
    }
}

impl SessionProfile {
    /// Parses a profile from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let profile: SessionProfile = toml::from_str(content)?;
        debug!(
            "parsed session profile: version {}, {} options",
            profile.version,
            profile.options.len()
        );
        Ok(profile)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Captures `options` as a profile holding only its non-default values.
    pub fn from_options(options: &Options) -> Self {
        let client = options.client_options();
        let values = options
            .non_default_values()
            .into_iter()
            .filter_map(|(key, value)| to_toml_value(&value).map(|v| (key.as_str().to_string(), v)))
            .collect();

        Self {
            version: options.version().as_str().to_string(),
            client: ClientSection {
                agent_version: client.version.clone(),
                spawner: client.spawner,
            },
            options: values,
        }
    }

    pub fn protocol_version(&self) -> Result<ProtocolVersion, ConfigError> {
        Ok(self.version.parse()?)
    }

    /// The launch options the profile describes, as an [`Init`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOption`] for a name no version knows and
    /// [`ConfigError::Options`] for a value TOML cannot express as an option.
    pub fn init(&self) -> Result<Init, ConfigError> {
        let mut init = Init::new();
        for (name, raw) in &self.options {
            let key = OptionKey::from_wire_name(name)
                .ok_or_else(|| ConfigError::UnknownOption(name.clone()))?;
            let value = from_toml_value(key, raw)?;
            init.insert(key, value);
        }
        Ok(init)
    }

    /// Builds session [`Options`] from the profile.
    ///
    /// Version-specific checks (option supported, value of the right kind)
    /// are those of [`Options::with_client_options`].
    pub fn into_options(self) -> Result<Options, ConfigError> {
        let version = self.protocol_version()?;
        let init = self.init()?;
        let client = ClientOptions {
            version: self.client.agent_version,
            spawner: self.client.spawner,
        };
        Ok(Options::with_client_options(version, init, client)?)
    }
}

fn from_toml_value(key: OptionKey, raw: &toml::Value) -> Result<OptionValue, ConfigError> {
    match raw {
        toml::Value::Boolean(b) => Ok(OptionValue::Bool(*b)),
        toml::Value::Integer(i) => Ok(OptionValue::Int(*i)),
        toml::Value::Float(f) => Ok(OptionValue::Float(*f)),
        toml::Value::String(s) => Ok(OptionValue::from(s.as_str())),
        other => Err(OptionsError::InvalidValue {
            key,
            value: other.to_string(),
        }
        .into()),
    }
}

fn to_toml_value(value: &OptionValue) -> Option<toml::Value> {
    match value {
        OptionValue::Unset => None,
        OptionValue::Bool(b) => Some(toml::Value::Boolean(*b)),
        OptionValue::Int(i) => Some(toml::Value::Integer(*i)),
        OptionValue::Float(f) => Some(toml::Value::Float(*f)),
        OptionValue::Str(s) => Some(toml::Value::String(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::VideoCodec;

    #[test]
    fn test_deserialize_minimal_toml_uses_defaults() {
        // Arrange
        let toml = "";

        // Act
        let profile = SessionProfile::from_toml_str(toml).unwrap();

        // Assert
        assert_eq!(profile, SessionProfile::default());
        assert_eq!(profile.protocol_version().unwrap(), ProtocolVersion::LATEST);
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result = SessionProfile::from_toml_str("version = [unclosed");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_full_profile_builds_options() {
        // Arrange
        let toml = r#"
            version = "2.7"

            [client]
            agent_version = "2.7-custom"
            spawner = "shell"

            [options]
            max_size = 1920
            max_fps = 30
            video_codec = "h265"
            audio = false
        "#;

        // Act
        let options = SessionProfile::from_toml_str(toml)
            .unwrap()
            .into_options()
            .unwrap();

        // Assert
        assert_eq!(options.version(), ProtocolVersion::V2_7);
        assert_eq!(options.agent_version(), "2.7-custom");
        assert_eq!(options.client_options().spawner, SpawnStrategy::Shell);
        assert_eq!(options.get(OptionKey::MaxSize), Some(&OptionValue::Int(1920)));
        assert_eq!(options.get(OptionKey::MaxFps), Some(&OptionValue::Float(30.0)));
        assert_eq!(
            options.get(OptionKey::VideoCodec),
            Some(&OptionValue::from(VideoCodec::H265))
        );
        assert_eq!(options.get(OptionKey::Audio), Some(&OptionValue::Bool(false)));
    }

    #[test]
    fn test_unknown_option_name_fails() {
        // Arrange
        let profile = SessionProfile::from_toml_str("[options]\nwarp_speed = 9").unwrap();

        // Act
        let result = profile.into_options();

        // Assert
        assert!(matches!(result, Err(ConfigError::UnknownOption(name)) if name == "warp_speed"));
    }

    #[test]
    fn test_option_from_newer_version_fails() {
        let profile =
            SessionProfile::from_toml_str("version = \"1.25\"\n[options]\naudio = true").unwrap();
        assert!(matches!(
            profile.into_options(),
            Err(ConfigError::Options(OptionsError::UnsupportedOption { .. }))
        ));
    }

    #[test]
    fn test_wrongly_typed_value_fails() {
        // Arrange
        let profile = SessionProfile::from_toml_str("[options]\nmax_size = \"big\"").unwrap();

        // Act
        let result = profile.into_options();

        // Assert
        assert!(matches!(
            result,
            Err(ConfigError::Options(OptionsError::InvalidValue {
                key: OptionKey::MaxSize,
                ..
            }))
        ));
    }

    #[test]
    fn test_table_value_fails() {
        let profile = SessionProfile::from_toml_str("[options.max_size]\nx = 1").unwrap();
        assert!(matches!(
            profile.init(),
            Err(ConfigError::Options(OptionsError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_unknown_version_fails() {
        let profile = SessionProfile::from_toml_str("version = \"0.9\"").unwrap();
        assert!(matches!(
            profile.into_options(),
            Err(ConfigError::Version(VersionError::UnknownVersion(v))) if v == "0.9"
        ));
    }

    #[test]
    fn test_from_options_keeps_only_non_default_values() {
        // Arrange
        let options = Options::new(
            ProtocolVersion::V3_1,
            Init::new().max_size(1024).video_codec(VideoCodec::Av1),
        )
        .unwrap();

        // Act
        let profile = SessionProfile::from_options(&options);

        // Assert
        assert_eq!(profile.version, "3.1");
        assert_eq!(profile.options.len(), 2);
        assert_eq!(profile.options["max_size"], toml::Value::Integer(1024));
        assert_eq!(
            profile.options["video_codec"],
            toml::Value::String("av1".to_string())
        );
    }

    #[test]
    fn test_toml_text_round_trips_a_profile() {
        // Arrange
        let options = Options::new(ProtocolVersion::V2_4, Init::new().max_fps(24.5)).unwrap();
        let profile = SessionProfile::from_options(&options);

        // Act
        let text = profile.to_toml_string().unwrap();
        let parsed = SessionProfile::from_toml_str(&text).unwrap();

        // Assert
        assert_eq!(parsed, profile);
        assert_eq!(
            parsed.into_options().unwrap().get(OptionKey::MaxFps),
            Some(&OptionValue::Float(24.5))
        );
    }

    #[test]
    fn test_misspelled_codec_in_profile_fails() {
        let profile = SessionProfile::from_toml_str("[options]
video_codec = \"h256\"").unwrap();
        assert!(matches!(
            profile.into_options(),
            Err(ConfigError::Options(OptionsError::InvalidValue {
                key: OptionKey::VideoCodec,
                ..
            }))
        ));
    }
}
