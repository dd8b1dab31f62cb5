//! Parser instances and per-file incremental parse trees
//!
//! Tree-sitter parsers are stateful and not `Sync`, so a [`ParserManager`] is a
//! plain owned value that the host constructs and lends out by `&mut`. It keeps
//! one parser per grammar and the last tree parsed for each path, so that
//! edits can be applied to the cached tree and the next parse of that path is
//! incremental.

use crate::error::{IndexError, Result};
use codag_core::Language;
use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};
use tree_sitter::{InputEdit, Parser, Point, Tree};

/// Grammar for a language.
pub fn grammar(language: Language) -> tree_sitter::Language {
    match language {
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::C => tree_sitter_c::LANGUAGE.into(),
        Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        Language::Swift => tree_sitter_swift::LANGUAGE.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::Lua => tree_sitter_lua::LANGUAGE.into(),
    }
}

/// A text change, in the coordinates of the content before the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
    pub start_position: Point,
    pub old_end_position: Point,
    pub new_end_position: Point,
}

impl From<TextEdit> for InputEdit {
    fn from(edit: TextEdit) -> Self {
        InputEdit {
            start_byte: edit.start_byte,
            old_end_byte: edit.old_end_byte,
            new_end_byte: edit.new_end_byte,
            start_position: edit.start_position,
            old_end_position: edit.old_end_position,
            new_end_position: edit.new_end_position,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    handles_acquired: AtomicUsize,
    handles_released: AtomicUsize,
    trees_cached: AtomicUsize,
    trees_evicted: AtomicUsize,
}

/// Snapshot of tree bookkeeping. Once every handle is dropped and the manager
/// disposed, acquisitions equal releases and every cached tree was evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub handles_acquired: usize,
    pub handles_released: usize,
    pub trees_cached: usize,
    pub trees_evicted: usize,
}

impl TreeStats {
    pub fn is_balanced(&self) -> bool {
        self.handles_acquired == self.handles_released && self.trees_cached == self.trees_evicted
    }
}

/// A parse tree handed out by [`ParserManager::parse`]. Dropping it releases it.
pub struct ParsedTree {
    tree: Tree,
    counters: Arc<Counters>,
}

impl ParsedTree {
    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}

impl Deref for ParsedTree {
    type Target = Tree;

    fn deref(&self) -> &Tree {
        &self.tree
    }
}

impl Drop for ParsedTree {
    fn drop(&mut self) {
        self.counters.handles_released.fetch_add(1, Ordering::Relaxed);
    }
}

struct CachedTree {
    language: Language,
    tree: Tree,
}

/// Owns parser instances and the per-path tree cache.
pub struct ParserManager {
    parsers: HashMap<Language, Parser>,
    trees: HashMap<PathBuf, CachedTree>,
    initialized: bool,
    counters: Arc<Counters>,
}

impl ParserManager {
    pub fn new() -> Self {
        ParserManager {
            parsers: HashMap::new(),
            trees: HashMap::new(),
            initialized: false,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Load every grammar. A grammar that fails to load leaves its language
    /// unavailable without affecting the others. Calling this twice is a no-op.
    pub fn init(&mut self) {
        if self.initialized {
            return;
        }
        for language in Language::ALL {
            let mut parser = Parser::new();
            match parser.set_language(&grammar(language)) {
                Ok(()) => {
                    self.parsers.insert(language, parser);
                }
                Err(e) => {
                    let error = IndexError::Grammar {
                        language,
                        message: e.to_string(),
                    };
                    warn!("{}", error);
                }
            }
        }
        self.initialized = true;
        debug!("Loaded {} grammars", self.parsers.len());
    }

    pub fn is_available(&self) -> bool {
        self.initialized && !self.parsers.is_empty()
    }

    pub fn supports(&self, language: Language) -> bool {
        self.parsers.contains_key(&language)
    }

    pub fn get_language_for_file(&self, path: &Path) -> Option<Language> {
        Language::from_path(path)
    }

    /// Apply an edit to the cached tree of `path`. Returns false when nothing is
    /// cached for it. Edits must be applied in the order they happened.
    pub fn apply_edit(&mut self, path: &Path, edit: &TextEdit) -> bool {
        match self.trees.get_mut(path) {
            Some(cached) => {
                cached.tree.edit(&InputEdit::from(*edit));
                true
            }
            None => false,
        }
    }

    /// Parse `code`. With a `path`, the cached tree for it (if any, and of the
    /// same language) is reused for an incremental parse and then replaced.
    pub fn parse(&mut self, code: &str, language: Language, path: Option<&Path>) -> Result<ParsedTree> {
        self.init();
        let parser = self
            .parsers
            .get_mut(&language)
            .ok_or(IndexError::ParserUnavailable(language))?;

        let old_tree = path
            .and_then(|p| self.trees.get(p))
            .filter(|cached| cached.language == language)
            .map(|cached| &cached.tree);

        let tree = parser.parse(code, old_tree).ok_or_else(|| IndexError::ParseFailure {
            path: path.map(|p| p.display().to_string()).unwrap_or_else(|| "<memory>".to_string()),
            language,
        })?;

        if let Some(path) = path {
            let cached = CachedTree {
                language,
                tree: tree.clone(),
            };
            if self.trees.insert(path.to_path_buf(), cached).is_some() {
                self.counters.trees_evicted.fetch_add(1, Ordering::Relaxed);
            }
            self.counters.trees_cached.fetch_add(1, Ordering::Relaxed);
        }

        self.counters.handles_acquired.fetch_add(1, Ordering::Relaxed);
        Ok(ParsedTree {
            tree,
            counters: Arc::clone(&self.counters),
        })
    }

    /// Forget the cached tree of `path`, for content replaced without edits.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let removed = self.trees.remove(path).is_some();
        if removed {
            self.counters.trees_evicted.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Release every cached tree and parser. A later parse re-initialises.
    pub fn dispose(&mut self) {
        let evicted = self.trees.len();
        self.trees.clear();
        self.counters.trees_evicted.fetch_add(evicted, Ordering::Relaxed);
        self.parsers.clear();
        self.initialized = false;
        debug!("Disposed parser manager, released {} cached trees", evicted);
    }

    pub fn cached_tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            handles_acquired: self.counters.handles_acquired.load(Ordering::Relaxed),
            handles_released: self.counters.handles_released.load(Ordering::Relaxed),
            trees_cached: self.counters.trees_cached.load(Ordering::Relaxed),
            trees_evicted: self.counters.trees_evicted.load(Ordering::Relaxed),
        }
    }
}

impl Default for ParserManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let mut parsers = ParserManager::new();
        assert!(!parsers.is_available());
        parsers.init();
        parsers.init();
        assert!(parsers.is_available());
        for language in Language::ALL {
            assert!(parsers.supports(language), "{} grammar missing", language);
        }
    }

    #[test]
    fn test_parse_rust() {
        let mut parsers = ParserManager::new();
        let tree = parsers.parse("fn main() {}\n", Language::Rust, None).unwrap();
        assert_eq!(tree.root_node().kind(), "source_file");
        assert_eq!(parsers.cached_tree_count(), 0);
    }

    #[test]
    fn test_incremental_reparse_after_edit() {
        let mut parsers = ParserManager::new();
        let path = Path::new("app.py");
        let before = "def a():\n    pass\n";
        drop(parsers.parse(before, Language::Python, Some(path)).unwrap());

        // Rename `a` to `abc`.
        let after = "def abc():\n    pass\n";
        let edit = TextEdit {
            start_byte: 5,
            old_end_byte: 5,
            new_end_byte: 7,
            start_position: Point::new(0, 5),
            old_end_position: Point::new(0, 5),
            new_end_position: Point::new(0, 7),
        };
        assert!(parsers.apply_edit(path, &edit));
        assert!(!parsers.apply_edit(Path::new("other.py"), &edit));

        let tree = parsers.parse(after, Language::Python, Some(path)).unwrap();
        let function = tree.root_node().named_child(0).unwrap();
        let name = function.child_by_field_name("name").unwrap();
        assert_eq!(name.utf8_text(after.as_bytes()).unwrap(), "abc");
        assert_eq!(parsers.cached_tree_count(), 1);
    }

    #[test]
    fn test_handles_and_cache_entries_are_released() {
        let mut parsers = ParserManager::new();
        let path = Path::new("lib.rs");
        let first = parsers.parse("fn a() {}", Language::Rust, Some(path)).unwrap();
        let second = parsers.parse("fn b() {}", Language::Rust, Some(path)).unwrap();
        let stats = parsers.stats();
        assert_eq!(stats.handles_acquired, 2);
        assert_eq!(stats.handles_released, 0);
        assert_eq!(stats.trees_evicted, 1);

        drop(first);
        drop(second);
        assert!(!parsers.stats().is_balanced());

        parsers.dispose();
        let stats = parsers.stats();
        assert!(stats.is_balanced(), "{:?}", stats);
        assert_eq!(parsers.cached_tree_count(), 0);
    }

    #[test]
    fn test_invalidate() {
        let mut parsers = ParserManager::new();
        let path = Path::new("a.go");
        drop(parsers.parse("package main\n", Language::Go, Some(path)).unwrap());
        assert!(parsers.invalidate(path));
        assert!(!parsers.invalidate(path));
        assert!(parsers.stats().is_balanced());
    }
}
