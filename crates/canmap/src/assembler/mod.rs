// crates/canmap/src/assembler/mod.rs

//! Assembly of one message set from its configuration layers.
//!
//! Layers are applied lowest precedence first:
//! 1. parents, flattened underneath the file (`parents`),
//! 2. mapping overlays, each with its database import underneath (`mappings`),
//! 3. the file's own `messages` and `commands`.

use crate::config::CompileOptions;
use crate::diag::SetContext;
use crate::error::CompileError;
use crate::merge::deep_merge;
use crate::model::{MessageSetFile, message_key, parse_identifier, parse_record};
use crate::types::MessageSet;
use serde_json::{Map, Value};

// --- Sub-modules ---

mod builder;
mod mappings;
mod parents;

pub(crate) use builder::MessageSetBuilder;

/// Name given to a message set whose file does not declare one.
pub const DEFAULT_SET_NAME: &str = "generic";

/// Loads the message set `name` (resolved through the search paths) together
/// with all of its parents, mappings and databases.
///
/// The returned set is not validated; see [`MessageSet::validate`].
pub fn assemble(name: &str, options: &CompileOptions) -> Result<MessageSet, CompileError> {
    let (path, data) = parents::load_flattened(name, &options.search_paths)?;
    let file: MessageSetFile = parse_record(data, || format!("message set {}", path.display()))?;

    let set_name = file.name.unwrap_or_else(|| DEFAULT_SET_NAME.to_string());
    let ctx = SetContext::new(&set_name);
    set_info!(ctx, "Assembling message set from {}", path.display());

    let mut builder = MessageSetBuilder::new(set_name.clone(), file.bit_numbering_inverted);
    builder.buses(file.buses)?;
    builder.initializers(file.initializers);
    builder.loopers(file.loopers);
    builder.extra_sources(file.extra_sources);

    let overlay =
        mappings::load_mappings(&set_name, &file.mappings, |bus| builder.has_bus(bus), options)?;
    builder.initializers(overlay.initializers);
    builder.loopers(overlay.loopers);
    builder.extra_sources(overlay.extra_sources);

    for (key, message) in overlay.messages {
        builder.merge_message(&key, message)?;
    }
    for (key, message) in normalize_message_keys(file.messages)? {
        builder.merge_message(&key, message)?;
    }

    builder.commands(overlay.commands);
    builder.commands(file.commands);
    builder.diagnostic_messages(overlay.diagnostic_messages);
    builder.diagnostic_messages(file.diagnostic_messages);

    builder.build()
}

/// Rewrites message keys to canonical hex so that `"256"` and `"0x100"` meet.
///
/// Two keys naming the same id within one object are merged in order.
pub(crate) fn normalize_message_keys(
    messages: Map<String, Value>,
) -> Result<Map<String, Value>, CompileError> {
    let mut normalized = Map::new();
    for (key, message) in messages {
        let canonical = message_key(parse_identifier(&key)?);
        let merged = match normalized.remove(&canonical) {
            Some(existing) => deep_merge(existing, message),
            None => message,
        };
        normalized.insert(canonical, merged);
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_normalized_and_merged() {
        let messages = json!({"256": {"name": "a"}, "0X100": {"enabled": false}, "0b11": {}});
        let normalized = normalize_message_keys(messages.as_object().unwrap().clone()).unwrap();
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized["0x100"]["name"], "a");
        assert_eq!(normalized["0x100"]["enabled"], false);
        assert!(normalized.contains_key("0x3"));
    }

    #[test]
    fn invalid_key_is_fatal() {
        let messages = json!({"speed": {}});
        assert!(matches!(
            normalize_message_keys(messages.as_object().unwrap().clone()),
            Err(CompileError::InvalidIdentifier { .. })
        ));
    }
}
