// crates/canmap/src/model/mod.rs

//! Internal `serde` records that map directly onto the JSON configuration files.
//!
//! Every entity record is a sparse layer: each field is `Option` so that a
//! later layer only overrides what it explicitly supplies. Records reject
//! attributes they do not know; messages and signals are checked by name first
//! so that the error can point at the offending entity.

use crate::error::CompileError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Copies every field the incoming layer supplies over the existing one.
macro_rules! overlay_fields {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $(
            if $src.$field.is_some() {
                $dst.$field = $src.$field;
            }
        )+
    };
}

pub mod bus;
pub mod command;
pub mod message;
pub mod signal;

pub use bus::BusConfig;
pub use command::{CommandConfig, DiagnosticConfig};
pub use message::MessageConfig;
pub use signal::SignalConfig;

fn bool_true() -> bool {
    true
}

/// A fully flattened message-set file (parents already merged in).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageSetFile {
    #[serde(default)]
    pub name: Option<String>,

    /// Always empty once parents have been flattened.
    #[serde(default)]
    pub parents: Vec<String>,

    #[serde(default = "bool_true")]
    pub bit_numbering_inverted: bool,

    #[serde(default)]
    pub buses: BTreeMap<String, BusConfig>,

    #[serde(default)]
    pub mappings: Vec<MappingRef>,

    /// Raw message objects keyed by id; parsed per message for precise errors.
    #[serde(default)]
    pub messages: Map<String, Value>,

    #[serde(default)]
    pub commands: Vec<CommandConfig>,

    #[serde(default)]
    pub diagnostic_messages: Vec<DiagnosticConfig>,

    #[serde(default)]
    pub initializers: Vec<String>,

    #[serde(default)]
    pub loopers: Vec<String>,

    #[serde(default)]
    pub extra_sources: Vec<String>,
}

/// One entry of a message set's `mappings` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingRef {
    pub mapping: String,

    #[serde(default)]
    pub bus: Option<String>,

    #[serde(default = "bool_true")]
    pub enabled: bool,

    #[serde(default)]
    pub database: Option<String>,
}

/// The contents of a mapping overlay file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingFile {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub messages: Map<String, Value>,

    #[serde(default)]
    pub commands: Vec<CommandConfig>,

    #[serde(default)]
    pub diagnostic_messages: Vec<DiagnosticConfig>,

    #[serde(default)]
    pub initializers: Vec<String>,

    #[serde(default)]
    pub loopers: Vec<String>,

    #[serde(default)]
    pub extra_sources: Vec<String>,
}

/// A superset: several message sets compiled into one artifact.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupersetFile {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub message_sets: Vec<String>,
}

/// An integer given either as a JSON number or as text in any supported base.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Int(u64),
    Text(String),
}

impl IdValue {
    pub fn resolve(&self) -> Result<u32, CompileError> {
        match self {
            IdValue::Int(v) => u32::try_from(*v).map_err(|_| CompileError::InvalidIdentifier {
                value: v.to_string(),
            }),
            IdValue::Text(s) => parse_identifier(s),
        }
    }
}

// --- Helper Functions ---

/// Parses `0x..`, `0o..`, `0b..` or decimal text into an integer.
pub fn parse_identifier(s: &str) -> Result<u32, CompileError> {
    let trimmed = s.trim();
    let lower = trimmed.to_ascii_lowercase();
    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        u32::from_str_radix(oct, 8)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u32::from_str_radix(bin, 2)
    } else {
        lower.parse::<u32>()
    };
    parsed.map_err(|_| CompileError::InvalidIdentifier {
        value: s.to_string(),
    })
}

/// Canonical key under which a message id is merged.
pub fn message_key(id: u32) -> String {
    format!("0x{:x}", id)
}

/// Rejects attributes outside `fields`, naming the entity they were found on.
pub(crate) fn check_attributes(
    object: &Map<String, Value>,
    fields: &[&str],
    entity: &'static str,
    name: &str,
    message: &str,
) -> Result<(), CompileError> {
    match object.keys().find(|key| !fields.contains(&key.as_str())) {
        Some(attribute) => Err(CompileError::UnknownAttribute {
            entity,
            name: name.to_string(),
            message: message.to_string(),
            attribute: attribute.clone(),
        }),
        None => Ok(()),
    }
}

/// Deserializes a record, attaching `context` to any schema error.
pub(crate) fn parse_record<T: DeserializeOwned>(
    value: Value,
    context: impl FnOnce() -> String,
) -> Result<T, CompileError> {
    serde_json::from_value(value).map_err(|source| CompileError::Schema {
        context: context(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_identifiers_in_any_base() {
        assert_eq!(parse_identifier("0x100").unwrap(), 0x100);
        assert_eq!(parse_identifier("0X1aB").unwrap(), 0x1ab);
        assert_eq!(parse_identifier("256").unwrap(), 256);
        assert_eq!(parse_identifier("0o17").unwrap(), 0o17);
        assert_eq!(parse_identifier("0b101").unwrap(), 5);
        assert!(matches!(
            parse_identifier("0xZZ"),
            Err(CompileError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn id_value_accepts_numbers_and_text() {
        let values: Vec<IdValue> = serde_json::from_value(json!([2016, "0x7df"])).unwrap();
        assert_eq!(values[0].resolve().unwrap(), 2016);
        assert_eq!(values[1].resolve().unwrap(), 0x7df);
    }

    #[test]
    fn unknown_attribute_is_reported_with_context() {
        let object = json!({"bit_position": 0, "unit_of_measure": "km/h"});
        let err = check_attributes(
            object.as_object().unwrap(),
            SignalConfig::FIELDS,
            "signal",
            "speed",
            "0x100",
        )
        .unwrap_err();
        match err {
            CompileError::UnknownAttribute {
                name,
                message,
                attribute,
                ..
            } => {
                assert_eq!(name, "speed");
                assert_eq!(message, "0x100");
                assert_eq!(attribute, "unit_of_measure");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn message_set_file_defaults() {
        let file: MessageSetFile = serde_json::from_value(json!({})).unwrap();
        assert!(file.name.is_none());
        assert!(file.bit_numbering_inverted);
        assert!(file.buses.is_empty());
    }

    #[test]
    fn message_set_file_rejects_typos() {
        let result = serde_json::from_value::<MessageSetFile>(json!({"mesages": {}}));
        assert!(result.is_err());
    }
}
