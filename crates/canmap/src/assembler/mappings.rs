// crates/canmap/src/assembler/mappings.rs

//! Loading of mapping overlay files.

use super::normalize_message_keys;
use crate::config::CompileOptions;
use crate::database::merge_database_into_mapping;
use crate::diag::SetContext;
use crate::error::CompileError;
use crate::merge::deep_merge;
use crate::model::{CommandConfig, DiagnosticConfig, MappingFile, MappingRef, parse_record};
use serde_json::{Map, Value};

/// Everything the mappings of one message set contribute, in mapping order.
#[derive(Debug, Default)]
pub(crate) struct MappingOverlay {
    /// `(canonical key, raw message object)` pairs with mapping defaults applied.
    pub messages: Vec<(String, Value)>,
    pub commands: Vec<CommandConfig>,
    pub diagnostic_messages: Vec<DiagnosticConfig>,
    pub initializers: Vec<String>,
    pub loopers: Vec<String>,
    pub extra_sources: Vec<String>,
}

/// Loads every mapping referenced by a message set.
///
/// `has_bus` tells whether the message set defines a bus name.
pub(crate) fn load_mappings(
    set_name: &str,
    mappings: &[MappingRef],
    has_bus: impl Fn(&str) -> bool,
    options: &CompileOptions,
) -> Result<MappingOverlay, CompileError> {
    let ctx = SetContext::new(set_name);
    let mut overlay = MappingOverlay::default();

    for mapping in mappings {
        if !mapping.enabled {
            set_warn!(ctx, "Mapping '{}' is disabled", mapping.mapping);
            if options.skip_disabled_mappings {
                continue;
            }
        }

        match mapping.bus.as_deref() {
            None => set_warn!(ctx, "No default bus associated with '{}' mapping", mapping.mapping),
            Some(bus) if !has_bus(bus) => {
                return Err(CompileError::UndefinedMappingBus {
                    bus: bus.to_string(),
                    mapping: mapping.mapping.clone(),
                });
            }
            Some(_) => {}
        }

        let (path, data) = options.search_paths.load_json(&mapping.mapping)?;
        let file: MappingFile = parse_record(data, || format!("mapping {}", path.display()))?;
        set_debug!(
            ctx,
            "Loaded mapping {} ({})",
            path.display(),
            file.name.as_deref().unwrap_or("unnamed")
        );
        apply_mapping(&ctx, mapping, file, options, &mut overlay)?;
    }

    Ok(overlay)
}

fn apply_mapping(
    ctx: &SetContext<'_>,
    mapping: &MappingRef,
    file: MappingFile,
    options: &CompileOptions,
    overlay: &mut MappingOverlay,
) -> Result<(), CompileError> {
    let enabled = mapping.enabled;

    overlay
        .commands
        .extend(file.commands.into_iter().map(|mut command| {
            if !enabled {
                command.enabled = Some(false);
            }
            command
        }));

    overlay
        .diagnostic_messages
        .extend(file.diagnostic_messages.into_iter().map(|mut diagnostic| {
            if diagnostic.bus.is_none() {
                diagnostic.bus = mapping.bus.clone();
            }
            if !enabled {
                diagnostic.enabled = Some(false);
            }
            diagnostic
        }));

    if enabled {
        overlay.initializers.extend(file.initializers);
        overlay.loopers.extend(file.loopers);
        overlay.extra_sources.extend(file.extra_sources);
    }

    if file.messages.is_empty() {
        set_warn!(ctx, "Mapping file '{}' doesn't define any messages", mapping.mapping);
    }

    let mut messages = normalize_message_keys(file.messages)?;
    if let Some(database) = &mapping.database {
        let database_path = options.search_paths.find(database)?;
        let imported = merge_database_into_mapping(&database_path, &messages)?;
        set_info!(
            ctx,
            "Imported {} message(s) from {}",
            imported.len(),
            database_path.display()
        );
        messages = match deep_merge(Value::Object(imported), Value::Object(messages)) {
            Value::Object(merged) => merged,
            _ => Map::new(),
        };
    }

    for (key, mut message) in messages {
        if let Value::Object(object) = &mut message {
            if let Some(bus) = &mapping.bus {
                object
                    .entry("bus")
                    .or_insert_with(|| Value::String(bus.clone()));
            }
            object.entry("enabled").or_insert(Value::Bool(enabled));
        }
        overlay.messages.push((key, message));
    }

    Ok(())
}
