//! Codag Indexer: parsing, structural extraction and repo-wide linking

pub mod call_graph;
pub mod config;
pub mod error;
pub mod extractor;
pub mod http;
pub mod languages;
pub mod parser;
pub mod patterns;
pub mod repo;
pub mod resolve;
pub mod routes;
pub mod workflow_graph;

#[cfg(test)]
pub mod tests;

pub use call_graph::{CallGraphDiff, FileCallGraph, diff_call_graphs, structural_hash};
pub use config::AnalysisConfig;
pub use error::{IndexError, Result};
pub use extractor::{Extractor, FileAnalysis, FileStructure, LlmCallSite, MODULE_SCOPE};
pub use http::{match_paths, normalize_path};
pub use parser::{ParsedTree, ParserManager, TextEdit, TreeStats};
pub use patterns::{LlmMatcher, PatternSet};
pub use repo::{RepoStructure, SourceFile};
pub use resolve::ModuleResolver;
pub use routes::RouteConvention;
pub use workflow_graph::{build_workflow_graph, node_id, repair_hints};
