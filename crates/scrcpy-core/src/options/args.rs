//! Launch argument serialization and parsing.
//!
//! Two styles exist.  Before 1.21 the agent took every option positionally,
//! in the order of the version's defaults table, with `-` standing for "no
//! value".  From 1.21 it takes `key=value` pairs and only options that differ
//! from their defaults are written, which keeps argument lists short and
//! stable for snapshot tests.

use super::value::{OptionKey, OptionValue};
use super::{Init, OptionsError};
use crate::version::ProtocolVersion;

/// Placeholder for an unset value in positional style.
pub(crate) const POSITIONAL_UNSET: &str = "-";

/// How launch options are laid out on the agent command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentStyle {
    Positional,
    KeyValue,
}

/// Writes `values` in `style`.  `defaults` must be in the version's key order.
pub(crate) fn serialize(
    style: ArgumentStyle,
    values: &[(OptionKey, OptionValue)],
    defaults: &[(OptionKey, OptionValue)],
) -> Vec<String> {
    match style {
        ArgumentStyle::Positional => values
            .iter()
            .map(|(_, value)| {
                value
                    .to_option_string()
                    .unwrap_or_else(|| POSITIONAL_UNSET.to_string())
            })
            .collect(),
        ArgumentStyle::KeyValue => values
            .iter()
            .zip(defaults)
            .filter(|((_, value), (_, default))| value != default)
            .filter_map(|((key, value), _)| {
                value
                    .to_option_string()
                    .map(|text| format!("{}={}", key.as_str(), text))
            })
            .collect(),
    }
}

/// Parses arguments written by [`serialize`] back into the non-default values.
pub(crate) fn parse<S: AsRef<str>>(
    version: ProtocolVersion,
    args: &[S],
) -> Result<Init, OptionsError> {
    let profile = version.profile();
    let defaults = profile.defaults();
    let mut init = Init::new();

    match profile.wire().arguments {
        ArgumentStyle::Positional => {
            if args.len() != defaults.len() {
                return Err(OptionsError::ArgumentCount {
                    expected: defaults.len(),
                    actual: args.len(),
                });
            }
            for ((key, default), raw) in defaults.iter().zip(args) {
                let value = parse_value(*key, raw.as_ref(), true)?;
                if value != *default {
                    init.insert(*key, value);
                }
            }
        }
        ArgumentStyle::KeyValue => {
            for arg in args {
                let arg = arg.as_ref();
                let (name, raw) = arg
                    .split_once('=')
                    .ok_or_else(|| OptionsError::MalformedArgument(arg.to_string()))?;
                let key = OptionKey::from_wire_name(name)
                    .filter(|key| profile.supports_option(*key))
                    .ok_or_else(|| OptionsError::UnsupportedOption {
                        key: name.to_string(),
                        version,
                    })?;
                let value = parse_value(key, raw, false)?;
                init.insert(key, value);
            }
        }
    }
    Ok(init)
}

fn parse_value(key: OptionKey, raw: &str, positional: bool) -> Result<OptionValue, OptionsError> {
    if positional && raw == POSITIONAL_UNSET {
        return Ok(OptionValue::Unset);
    }
    OptionValue::parse(key.kind(), raw)
        .filter(|value| key.accepts(value))
        .ok_or_else(|| OptionsError::InvalidValue {
            key,
            value: raw.to_string(),
        })
}
