// crates/canmap/src/loader.rs

//! Locating and reading configuration files.

use crate::error::CompileError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Ordered list of directories used to resolve relative file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPaths(Vec<PathBuf>);

impl Default for SearchPaths {
    fn default() -> Self {
        SearchPaths(vec![PathBuf::from(".")])
    }
}

impl SearchPaths {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        SearchPaths(paths.into_iter().map(Into::into).collect())
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.0.push(path.into());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    /// Resolves `name` to an existing file.
    ///
    /// Absolute names are used as-is; relative names are tried against each
    /// search path in order.
    pub fn find(&self, name: &str) -> Result<PathBuf, CompileError> {
        let candidate = Path::new(name);
        if candidate.is_absolute() {
            if candidate.is_file() {
                return Ok(candidate.to_path_buf());
            }
        } else if let Some(found) = self
            .0
            .iter()
            .map(|dir| dir.join(candidate))
            .find(|path| path.is_file())
        {
            return Ok(found);
        }

        Err(CompileError::FileNotFound {
            name: name.to_string(),
            search_paths: self.0.clone(),
        })
    }

    /// Finds and parses a JSON file, returning its resolved path alongside.
    pub fn load_json(&self, name: &str) -> Result<(PathBuf, Value), CompileError> {
        let path = self.find(name)?;
        let value = read_json(&path)?;
        Ok((path, value))
    }

    /// Finds a file and returns its contents verbatim.
    pub fn read_to_string(&self, name: &str) -> Result<String, CompileError> {
        let path = self.find(name)?;
        fs::read_to_string(&path).map_err(|source| CompileError::Io { path, source })
    }
}

pub(crate) fn read_json(path: &Path) -> Result<Value, CompileError> {
    let text = fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CompileError::JsonParsing {
        path: path.to_path_buf(),
        source,
    })
}
