// crates/canmap/src/lib.rs

#![doc = "Compiles layered CAN signal descriptions into indexed source tables."]
#![doc = ""]
#![doc = "A message set is described by JSON files (a base file, its `parents`,"]
#![doc = "and `mappings` optionally backed by an XML CAN database). The compiler"]
#![doc = "merges those layers, validates the result and emits fixed-size tables"]
#![doc = "plus decode glue for an embedded runtime."]
#![doc = ""]
#![doc = "It supports:"]
#![doc = "- `assemble`: Building one `MessageSet` from its configuration layers."]
#![doc = "- `compile`: Assembling, validating and generating a group of message sets."]
#![doc = "- `compile_superset`: The same for the sets listed in a superset file."]

// Must come first so the diagnostic macros are visible everywhere below.
#[macro_use]
mod diag;

// --- Crate Modules ---

pub mod assembler;
pub mod bits;
mod config;
mod database;
mod error;
pub mod generator;
mod loader;
pub mod merge;
pub mod model;
mod superset;
mod types;

// --- Public API Re-exports ---

pub use assembler::assemble;
pub use bits::BitInversionError;
pub use config::{BackendKind, CompileOptions};
pub use database::merge_database_into_mapping;
pub use error::CompileError;
pub use generator::{Backend, EmissionStats, Generated, generate};
pub use loader::SearchPaths;
pub use superset::load_superset;
pub use types::{
    Bus, BusId, Command, DiagnosticMessage, Message, MessageId, MessageSet, RawCanMode, Signal,
    SignalId, SignalState, VALID_BUS_ADDRESSES,
};

/// Assembles every message set in `names`, validates them all and generates
/// source for them together.
///
/// Nothing is returned unless every set assembled and validated.
pub fn compile<S: AsRef<str>>(
    names: &[S],
    options: &CompileOptions,
) -> Result<Generated, CompileError> {
    let sets = names
        .iter()
        .map(|name| assemble(name.as_ref(), options))
        .collect::<Result<Vec<_>, _>>()?;
    validate_and_generate(&sets, options)
}

/// Like [`compile`], for the message sets listed in a superset file.
pub fn compile_superset(name: &str, options: &CompileOptions) -> Result<Generated, CompileError> {
    let sets = load_superset(name, options)?;
    validate_and_generate(&sets, options)
}

fn validate_and_generate(
    sets: &[MessageSet],
    options: &CompileOptions,
) -> Result<Generated, CompileError> {
    if let Some(invalid) = sets.iter().find(|set| !set.validate()) {
        return Err(CompileError::InvalidMessageSet {
            name: invalid.name.clone(),
        });
    }
    generate(sets, options)
}
