// crates/canmap/src/superset.rs

//! Supersets: several message sets compiled into one artifact.

use crate::assembler::assemble;
use crate::config::CompileOptions;
use crate::error::CompileError;
use crate::model::{SupersetFile, parse_record};
use crate::types::MessageSet;

/// Loads a superset file and assembles every message set it lists, in order.
///
/// An empty superset is reported but not an error.
pub fn load_superset(name: &str, options: &CompileOptions) -> Result<Vec<MessageSet>, CompileError> {
    let (path, data) = options.search_paths.load_json(name)?;
    let superset: SupersetFile = parse_record(data, || format!("superset {}", path.display()))?;
    let label = superset.name.as_deref().unwrap_or(name);

    if superset.message_sets.is_empty() {
        log::warn!("Superset {} doesn't define any message sets", label);
    }
    log::info!(
        "Loading {} message set(s) for superset {}",
        superset.message_sets.len(),
        label
    );

    superset
        .message_sets
        .iter()
        .map(|set| assemble(set, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SearchPaths;
    use serde_json::json;
    use std::fs;

    #[test]
    fn empty_superset_yields_no_sets() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("all.json"), json!({"name": "all"}).to_string()).unwrap();
        let options = CompileOptions {
            search_paths: SearchPaths::new([dir.path()]),
            ..CompileOptions::default()
        };
        assert!(load_superset("all.json", &options).unwrap().is_empty());
    }

    #[test]
    fn missing_member_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("all.json"),
            json!({"message_sets": ["missing.json"]}).to_string(),
        )
        .unwrap();
        let options = CompileOptions {
            search_paths: SearchPaths::new([dir.path()]),
            ..CompileOptions::default()
        };
        assert!(matches!(
            load_superset("all.json", &options),
            Err(CompileError::FileNotFound { .. })
        ));
    }
}
