// crates/canmap/src/database.rs

//! Import of XML CAN databases (a `NetworkDefinition` exported from a `.dbc`).
//!
//! Only the messages and signals a mapping references are taken from the
//! database. The result has the same shape as a hand-written `messages` object
//! so that it can be merged underneath the mapping with [`deep_merge`].
//!
//! [`deep_merge`]: crate::merge::deep_merge

use crate::error::CompileError;
use serde_json::{Map, Value};
use std::path::Path;

/// Loads the database at `path` and extracts every signal referenced by
/// `messages` (a mapping's raw `messages` object).
///
/// Returns a `messages` object keyed by canonical hex id. Messages with no
/// matching signals are left out; ids missing from the database are reported
/// and skipped.
#[cfg(feature = "database")]
pub fn merge_database_into_mapping(
    path: &Path,
    messages: &Map<String, Value>,
) -> Result<Map<String, Value>, CompileError> {
    if messages.is_empty() {
        log::warn!("No messages specified for mapping from {}", path.display());
        return Ok(Map::new());
    }

    let text = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let network: xml::NetworkDefinition =
        quick_xml::de::from_str(&text).map_err(|source| CompileError::XmlParsing {
            path: path.to_path_buf(),
            source,
        })?;

    network.extract(path, messages)
}

/// Without XML support any database reference is fatal.
#[cfg(not(feature = "database"))]
pub fn merge_database_into_mapping(
    path: &Path,
    _messages: &Map<String, Value>,
) -> Result<Map<String, Value>, CompileError> {
    Err(CompileError::DatabaseUnsupported {
        database: path.display().to_string(),
    })
}

#[cfg(feature = "database")]
mod xml {
    //! Internal `serde` model of the database XML. Elements not listed here
    //! (receivers, value tables, comments) are ignored.

    use crate::error::CompileError;
    use crate::model::{message_key, parse_identifier};
    use serde::Deserialize;
    use serde_json::{Map, Value, json};
    use std::path::Path;

    #[derive(Debug, Deserialize)]
    pub(super) struct NetworkDefinition {
        #[serde(rename = "Node", default)]
        pub nodes: Vec<Node>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Node {
        #[serde(rename = "TxMessage", default)]
        pub tx_messages: Vec<TxMessage>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct TxMessage {
        #[serde(rename = "ID")]
        pub id: String,
        #[serde(rename = "Name")]
        pub name: String,
        #[serde(rename = "Signal", default)]
        pub signals: Vec<DbSignal>,
    }

    /// All numeric fields are kept as text and checked only when referenced,
    /// so incomplete signals nobody asks for do not block the import.
    #[derive(Debug, Deserialize)]
    pub(super) struct DbSignal {
        #[serde(rename = "Name", default)]
        pub name: String,
        #[serde(rename = "Bitposition")]
        pub bit_position: Option<String>,
        #[serde(rename = "Bitsize")]
        pub bit_size: Option<String>,
        #[serde(rename = "Factor")]
        pub factor: Option<String>,
        #[serde(rename = "Offset")]
        pub offset: Option<String>,
        #[serde(rename = "Minimum")]
        pub minimum: Option<String>,
        #[serde(rename = "Maximum")]
        pub maximum: Option<String>,
    }

    impl NetworkDefinition {
        fn find(&self, id: u32) -> Option<&TxMessage> {
            self.nodes
                .iter()
                .flat_map(|node| node.tx_messages.iter())
                .find(|message| parse_identifier(&message.id).ok() == Some(id))
        }

        pub(super) fn extract(
            &self,
            path: &Path,
            messages: &Map<String, Value>,
        ) -> Result<Map<String, Value>, CompileError> {
            let mut out = Map::new();
            for (key, message) in messages {
                let id = parse_identifier(key)?;
                let Some(node) = self.find(id) else {
                    log::warn!("Unable to find message ID 0x{:x} in {}", id, path.display());
                    continue;
                };

                let mut signals = Map::new();
                if let Some(wanted) = message.get("signals").and_then(Value::as_object) {
                    for name in wanted.keys() {
                        if let Some(signal) = node.signals.iter().find(|s| &s.name == name) {
                            signals.insert(name.clone(), signal.to_json(id, name)?);
                        }
                    }
                }

                if signals.is_empty() {
                    log::debug!("No referenced signals of 0x{:x} found in {}", id, path.display());
                    continue;
                }
                out.insert(
                    message_key(id),
                    json!({ "name": node.name, "signals": Value::Object(signals) }),
                );
            }
            Ok(out)
        }
    }

    impl DbSignal {
        fn to_json(&self, message_id: u32, generic_name: &str) -> Result<Value, CompileError> {
            let text = |field: &'static str, value: &Option<String>| -> Result<String, CompileError> {
                value
                    .as_deref()
                    .map(|v| v.trim().to_string())
                    .ok_or_else(|| CompileError::MissingDatabaseField {
                        message_id,
                        signal: self.name.clone(),
                        field,
                    })
            };
            let int = |field: &'static str, value: &Option<String>| -> Result<u32, CompileError> {
                let value = text(field, value)?;
                value
                    .parse::<u32>()
                    .map_err(|_| self.invalid(message_id, field, &value))
            };
            let float = |field: &'static str, value: &Option<String>| -> Result<f64, CompileError> {
                let value = text(field, value)?;
                value
                    .parse::<f64>()
                    .map_err(|_| self.invalid(message_id, field, &value))
            };

            Ok(json!({
                "generic_name": generic_name,
                "bit_position": int("Bitposition", &self.bit_position)?,
                "bit_size": int("Bitsize", &self.bit_size)?,
                "factor": float("Factor", &self.factor)?,
                "offset": float("Offset", &self.offset)?,
                "min_value": float("Minimum", &self.minimum)?,
                "max_value": float("Maximum", &self.maximum)?,
            }))
        }

        fn invalid(&self, message_id: u32, field: &'static str, value: &str) -> CompileError {
            CompileError::InvalidDatabaseField {
                message_id,
                signal: self.name.clone(),
                field,
                value: value.to_string(),
            }
        }
    }
}

#[cfg(all(test, feature = "database"))]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    const DATABASE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<NetworkDefinition>
  <Node name="ECM">
    <TxMessage>
      <ID>0x100</ID>
      <Name>ECM_z_100</Name>
      <Signal>
        <Name>VehSpd</Name>
        <Bitposition>7</Bitposition>
        <Bitsize>16</Bitsize>
        <Factor>0.01</Factor>
        <Offset>0</Offset>
        <Minimum>0</Minimum>
        <Maximum>655.35</Maximum>
      </Signal>
      <Signal>
        <Name>Unused</Name>
        <Bitposition>23</Bitposition>
        <Bitsize>8</Bitsize>
        <Factor>1</Factor>
        <Offset>0</Offset>
        <Minimum>0</Minimum>
        <Maximum>255</Maximum>
      </Signal>
      <Signal>
        <Name>Sketch</Name>
        <Bitposition>31</Bitposition>
        <Bitsize>8</Bitsize>
      </Signal>
    </TxMessage>
    <TxMessage>
      <ID>0x1A0</ID>
      <Name>ECM_z_1A0</Name>
      <Signal>
        <Name>Broken</Name>
        <Bitposition>seven</Bitposition>
        <Bitsize>1</Bitsize>
        <Factor>1</Factor>
        <Offset>0</Offset>
        <Minimum>0</Minimum>
        <Maximum>1</Maximum>
      </Signal>
    </TxMessage>
  </Node>
</NetworkDefinition>
"#;

    fn write_database() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.xml");
        fs::write(&path, DATABASE).unwrap();
        (dir, path)
    }

    #[test]
    fn extracts_only_referenced_signals() {
        let (_dir, path) = write_database();
        let mapping = json!({"256": {"signals": {"VehSpd": {"generic_name": "vehicle_speed"}}}});
        let out = merge_database_into_mapping(&path, mapping.as_object().unwrap()).unwrap();

        let message = &out["0x100"];
        assert_eq!(message["name"], "ECM_z_100");
        let signals = message["signals"].as_object().unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals["VehSpd"]["bit_position"], 7);
        assert_eq!(signals["VehSpd"]["bit_size"], 16);
        assert_eq!(signals["VehSpd"]["factor"], 0.01);
        assert_eq!(signals["VehSpd"]["max_value"], 655.35);
    }

    #[test]
    fn unknown_ids_and_unmatched_signals_are_skipped() {
        let (_dir, path) = write_database();
        let mapping = json!({
            "0x7ff": {"signals": {"VehSpd": {}}},
            "0x100": {"signals": {"NotThere": {}}}
        });
        let out = merge_database_into_mapping(&path, mapping.as_object().unwrap()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn matches_upper_case_hex_ids() {
        let (_dir, path) = write_database();
        let mapping = json!({"0x1a0": {"signals": {"Broken": {}}}});
        let err = merge_database_into_mapping(&path, mapping.as_object().unwrap()).unwrap_err();
        match err {
            CompileError::InvalidDatabaseField {
                message_id, field, ..
            } => {
                assert_eq!(message_id, 0x1a0);
                assert_eq!(field, "Bitposition");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn incomplete_signals_only_fail_when_referenced() {
        let (_dir, path) = write_database();
        let mapping = json!({"0x100": {"signals": {"VehSpd": {}}}});
        let out = merge_database_into_mapping(&path, mapping.as_object().unwrap()).unwrap();
        assert!(out["0x100"]["signals"].get("Sketch").is_none());

        let mapping = json!({"0x100": {"signals": {"Sketch": {}}}});
        let err = merge_database_into_mapping(&path, mapping.as_object().unwrap()).unwrap_err();
        match err {
            CompileError::MissingDatabaseField { signal, field, .. } => {
                assert_eq!(signal, "Sketch");
                assert_eq!(field, "Factor");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn empty_mapping_does_not_read_the_database() {
        let out = merge_database_into_mapping(Path::new("/does/not/exist.xml"), &Map::new()).unwrap();
        assert!(out.is_empty());
    }
}
