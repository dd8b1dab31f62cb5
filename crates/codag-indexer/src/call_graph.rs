//! Per-file call graphs for incremental re-analysis
//!
//! A [`FileCallGraph`] is the cheap view the host keeps per open file. Its
//! structural hash ignores formatting and line moves, so edits that do not
//! change which functions exist or what they call can skip re-analysis.

use crate::extractor::Extractor;
use crate::parser::ParserManager;
use codag_core::{FunctionDef, ImportRecord, Language};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCallGraph {
    pub file: PathBuf,
    pub language: Option<Language>,
    pub functions: BTreeMap<String, FunctionDef>,
    /// Function name → callee texts.
    pub call_graph: BTreeMap<String, Vec<String>>,
    /// Function name → matched LLM callees, including those reached through
    /// client variables.
    pub llm_calls: BTreeMap<String, Vec<String>>,
    pub imports: Vec<ImportRecord>,
    pub structural_hash: String,
}

impl FileCallGraph {
    pub fn empty(file: impl Into<PathBuf>) -> Self {
        let mut graph = FileCallGraph {
            file: file.into(),
            language: None,
            functions: BTreeMap::new(),
            call_graph: BTreeMap::new(),
            llm_calls: BTreeMap::new(),
            imports: Vec::new(),
            structural_hash: String::new(),
        };
        graph.structural_hash = structural_hash(&graph.call_graph);
        graph
    }
}

/// Hash over sorted function names and each function's sorted callees.
pub fn structural_hash(call_graph: &BTreeMap<String, Vec<String>>) -> String {
    let mut hasher = DefaultHasher::new();
    for (name, callees) in call_graph {
        name.hash(&mut hasher);
        let sorted: BTreeSet<&String> = callees.iter().collect();
        sorted.len().hash(&mut hasher);
        for callee in sorted {
            callee.hash(&mut hasher);
        }
    }
    format!("{:016x}", hasher.finish())
}

impl Extractor {
    /// Call graph of one file. Uses the per-path tree cache, so repeated calls
    /// for the same path after [`ParserManager::apply_edit`] reparse incrementally.
    pub fn extract_call_graph(&self, parsers: &mut ParserManager, code: &str, path: &Path) -> FileCallGraph {
        let Some(scan) = self.scan_file(parsers, code, path, true) else {
            return FileCallGraph::empty(path);
        };

        let call_graph: BTreeMap<String, Vec<String>> = scan
            .structure
            .functions
            .iter()
            .map(|f| (f.name.clone(), f.calls.clone()))
            .collect();
        let mut llm_calls: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for site in scan.llm_sites {
            let callees = llm_calls.entry(site.function).or_default();
            if !callees.contains(&site.callee) {
                callees.push(site.callee);
            }
        }
        let functions = scan
            .structure
            .functions
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();

        FileCallGraph {
            file: path.to_path_buf(),
            language: scan.structure.language,
            structural_hash: structural_hash(&call_graph),
            functions,
            call_graph,
            llm_calls,
            imports: scan.structure.imports,
        }
    }
}

/// What changed between two call graphs of the same file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGraphDiff {
    pub added_functions: Vec<String>,
    pub removed_functions: Vec<String>,
    /// Present in both with a different callee set.
    pub modified_functions: Vec<String>,
    /// `caller->callee` pairs.
    pub added_edges: Vec<String>,
    pub removed_edges: Vec<String>,
}

impl CallGraphDiff {
    pub fn has_structural_change(&self) -> bool {
        !(self.added_functions.is_empty()
            && self.removed_functions.is_empty()
            && self.modified_functions.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty())
    }
}

pub fn diff_call_graphs(old: &FileCallGraph, new: &FileCallGraph) -> CallGraphDiff {
    let mut diff = CallGraphDiff::default();
    if old.structural_hash == new.structural_hash && old.call_graph == new.call_graph {
        return diff;
    }

    for (name, callees) in &new.call_graph {
        match old.call_graph.get(name) {
            None => diff.added_functions.push(name.clone()),
            Some(previous) => {
                let before: BTreeSet<&String> = previous.iter().collect();
                let after: BTreeSet<&String> = callees.iter().collect();
                if before != after {
                    diff.modified_functions.push(name.clone());
                }
            }
        }
    }
    diff.removed_functions = old
        .call_graph
        .keys()
        .filter(|name| !new.call_graph.contains_key(*name))
        .cloned()
        .collect();

    let old_edges = edges(&old.call_graph);
    let new_edges = edges(&new.call_graph);
    diff.added_edges = new_edges.difference(&old_edges).cloned().collect();
    diff.removed_edges = old_edges.difference(&new_edges).cloned().collect();
    diff
}

fn edges(call_graph: &BTreeMap<String, Vec<String>>) -> BTreeSet<String> {
    call_graph
        .iter()
        .flat_map(|(caller, callees)| callees.iter().map(move |callee| format!("{}->{}", caller, callee)))
        .collect()
}
