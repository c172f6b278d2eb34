// crates/canmap/src/error.rs

use crate::bits::BitInversionError;
use core::fmt;
use std::io;
use std::path::PathBuf;

/// Fatal errors that abort a compilation.
///
/// Anything that only deserves a diagnostic is logged where it happens and
/// never reaches this type.
#[derive(Debug)]
pub enum CompileError {
    /// A configuration file could not be read.
    Io { path: PathBuf, source: io::Error },

    /// A configuration file is not valid JSON.
    JsonParsing {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A JSON value did not match the expected record shape.
    Schema {
        context: String,
        source: serde_json::Error,
    },

    /// An XML CAN database could not be deserialized.
    #[cfg(feature = "database")]
    XmlParsing {
        path: PathBuf,
        source: quick_xml::errors::serialize::DeError,
    },

    /// A referenced file does not exist in any search path.
    FileNotFound {
        name: String,
        search_paths: Vec<PathBuf>,
    },

    /// A file appears twice on its own inheritance chain.
    ParentCycle { path: PathBuf },

    /// A bus was declared without its mandatory `speed`.
    MissingBusSpeed { bus: String },

    /// A mapping names a default bus the message set does not define.
    UndefinedMappingBus { bus: String, mapping: String },

    /// A message or signal carries an attribute outside the recognized schema.
    UnknownAttribute {
        entity: &'static str,
        name: String,
        message: String,
        attribute: String,
    },

    /// A message, mode or PID identifier is not an integer in any supported base.
    InvalidIdentifier { value: String },

    /// A referenced field of a database signal could not be parsed.
    InvalidDatabaseField {
        message_id: u32,
        signal: String,
        field: &'static str,
        value: String,
    },

    /// A referenced database signal lacks one of its layout fields.
    MissingDatabaseField {
        message_id: u32,
        signal: String,
        field: &'static str,
    },

    /// A database import was requested but no XML support is compiled in.
    DatabaseUnsupported { database: String },

    /// A diagnostic message references a bus that is absent or invalid.
    UnresolvedDiagnosticBus { bus: Option<String>, id: u32 },

    /// A diagnostic message does not declare its request frequency.
    MissingDiagnosticFrequency { id: u32 },

    /// A signal cannot be expressed under the inverted bit numbering.
    BitInversion {
        message_set: String,
        message_id: u32,
        signal: String,
        source: BitInversionError,
    },

    /// A message set failed validation.
    InvalidMessageSet { name: String },

    /// An error occurred while formatting generated source.
    FmtError(fmt::Error),
}

impl From<fmt::Error> for CompileError {
    fn from(e: fmt::Error) -> Self {
        CompileError::FmtError(e)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Io { path, source } => {
                write!(f, "Unable to read {}: {}", path.display(), source)
            }
            CompileError::JsonParsing { path, source } => {
                write!(f, "{} does not contain valid JSON: {}", path.display(), source)
            }
            CompileError::Schema { context, source } => write!(f, "Invalid {}: {}", context, source),
            #[cfg(feature = "database")]
            CompileError::XmlParsing { path, source } => {
                write!(f, "Unable to parse CAN database {}: {}", path.display(), source)
            }
            CompileError::FileNotFound { name, search_paths } => write!(
                f,
                "Unable to find '{}' in search paths ({})",
                name,
                search_paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            CompileError::ParentCycle { path } => {
                write!(f, "Parent chain of {} loops back on itself", path.display())
            }
            CompileError::MissingBusSpeed { bus } => {
                write!(f, "Bus {} is missing the 'speed' attribute", bus)
            }
            CompileError::UndefinedMappingBus { bus, mapping } => {
                write!(f, "Bus '{}' (from mapping {}) is not defined", bus, mapping)
            }
            CompileError::UnknownAttribute {
                entity,
                name,
                message,
                attribute,
            } => write!(
                f,
                "Unrecognized attribute '{}' on {} '{}' (message {})",
                attribute, entity, name, message
            ),
            CompileError::InvalidIdentifier { value } => {
                write!(f, "'{}' is not a valid integer identifier", value)
            }
            CompileError::InvalidDatabaseField {
                message_id,
                signal,
                field,
                value,
            } => write!(
                f,
                "Database signal {} in message 0x{:x} has an invalid {}: '{}'",
                signal, message_id, field, value
            ),
            CompileError::MissingDatabaseField {
                message_id,
                signal,
                field,
            } => write!(
                f,
                "Database signal {} in message 0x{:x} has no {}",
                signal, message_id, field
            ),
            CompileError::DatabaseUnsupported { database } => write!(
                f,
                "Cannot import {}: built without CAN database support",
                database
            ),
            CompileError::UnresolvedDiagnosticBus { bus, id } => match bus {
                Some(bus) => write!(
                    f,
                    "Diagnostic message 0x{:x} references unknown or invalid bus '{}'",
                    id, bus
                ),
                None => write!(f, "Diagnostic message 0x{:x} has no bus", id),
            },
            CompileError::MissingDiagnosticFrequency { id } => {
                write!(f, "Diagnostic message 0x{:x} is missing the 'frequency' attribute", id)
            }
            CompileError::BitInversion {
                message_set,
                message_id,
                signal,
                source,
            } => write!(
                f,
                "Signal {} in message 0x{:x} (message set {}): {}",
                signal, message_id, message_set, source
            ),
            CompileError::InvalidMessageSet { name } => {
                write!(f, "Message set '{}' failed validation, unable to generate code", name)
            }
            CompileError::FmtError(e) => write!(f, "Formatting error: {}", e),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Io { source, .. } => Some(source),
            CompileError::JsonParsing { source, .. } => Some(source),
            CompileError::Schema { source, .. } => Some(source),
            #[cfg(feature = "database")]
            CompileError::XmlParsing { source, .. } => Some(source),
            CompileError::BitInversion { source, .. } => Some(source),
            CompileError::FmtError(e) => Some(e),
            _ => None,
        }
    }
}
