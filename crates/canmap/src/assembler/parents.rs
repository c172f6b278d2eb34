// crates/canmap/src/assembler/parents.rs

//! Flattening of `parents` inheritance chains into a single JSON object.

use crate::error::CompileError;
use crate::loader::SearchPaths;
use crate::merge::deep_merge;
use crate::model::parse_record;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Loads `name` and merges every ancestor underneath it.
///
/// Parents are flattened depth-first. Earlier entries of a `parents` list take
/// precedence over later ones, and the child always wins. A file that appears
/// twice on the same chain is a [`CompileError::ParentCycle`]; reaching a file
/// twice along different branches is fine.
pub(crate) fn load_flattened(
    name: &str,
    search_paths: &SearchPaths,
) -> Result<(PathBuf, Value), CompileError> {
    let mut chain = Vec::new();
    flatten(name, search_paths, &mut chain)
}

fn flatten(
    name: &str,
    search_paths: &SearchPaths,
    chain: &mut Vec<PathBuf>,
) -> Result<(PathBuf, Value), CompileError> {
    let (path, mut data) = search_paths.load_json(name)?;
    let identity = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
    if chain.contains(&identity) {
        return Err(CompileError::ParentCycle { path });
    }

    let parents: Vec<String> = match data.as_object_mut().and_then(|o| o.remove("parents")) {
        Some(value) => parse_record(value, || format!("'parents' list in {}", path.display()))?,
        None => Vec::new(),
    };

    chain.push(identity);
    for parent in &parents {
        log::debug!("Merging parent {} under {}", parent, path.display());
        let (_, parent_data) = flatten(parent, search_paths, chain)?;
        data = deep_merge(parent_data, data);
    }
    chain.pop();

    Ok((path, data))
}
