// crates/canmap/src/config.rs

//! Compile-time options shared by the assembler, the generator and the front end.

use crate::loader::SearchPaths;
use core::fmt;
use core::str::FromStr;
use std::path::PathBuf;

/// Selects the surface syntax of the generated source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// C++ tables plus a decode dispatch switch for the firmware.
    #[default]
    Cpp,
    /// Flat records for a small interpreter; decoding is left to the consumer.
    Python,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpp" | "c++" => Ok(BackendKind::Cpp),
            "python" | "py" => Ok(BackendKind::Python),
            other => Err(format!("unknown backend '{}' (expected cpp or python)", other)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Cpp => write!(f, "cpp"),
            BackendKind::Python => write!(f, "python"),
        }
    }
}

/// Options controlling one compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Directories searched, in order, for every relative file reference.
    pub search_paths: SearchPaths,
    /// Drop disabled mappings entirely instead of loading them disabled.
    pub skip_disabled_mappings: bool,
    pub backend: BackendKind,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            search_paths: SearchPaths::default(),
            skip_disabled_mappings: true,
            backend: BackendKind::Cpp,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a directory after the existing search paths.
    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path);
        self
    }

    pub fn skip_disabled_mappings(mut self, skip: bool) -> Self {
        self.skip_disabled_mappings = skip;
        self
    }

    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }
}
