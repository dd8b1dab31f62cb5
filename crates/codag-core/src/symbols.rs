//! Repo-wide function name table for global-namespace call resolution

use dashmap::DashMap;
use std::path::{Path, PathBuf};

/// A function identified by the file that defines it and its name there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionRef {
    pub file: PathBuf,
    pub name: String,
}

impl FunctionRef {
    pub fn new(file: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        FunctionRef {
            file: file.into(),
            name: name.into(),
        }
    }
}

/// Symbol table mapping bare function names to every definition with that
/// name. Thread-safe for concurrent inserts.
///
/// Lookups deliberately ignore which file the caller imports from: two
/// functions named `generate` in different files both answer for `generate`.
pub struct SymbolTable {
    by_name: DashMap<String, Vec<FunctionRef>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            by_name: DashMap::new(),
        }
    }

    /// Insert a definition.
    pub fn insert(&self, file: &Path, name: &str) {
        self.by_name
            .entry(name.to_string())
            .or_default()
            .push(FunctionRef::new(file, name));
    }

    /// All definitions with this bare name, in insertion order.
    pub fn lookup(&self, name: &str) -> Vec<FunctionRef> {
        self.by_name
            .get(name)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
