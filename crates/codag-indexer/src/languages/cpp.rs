//! C++ query sources and conventions

use super::c::{declarator_params, include_record};
use super::{LanguageRules, QuerySources, text};
use codag_core::ImportRecord;
use tree_sitter::Node;

// Any declarator: `run`, `Agent::run`, `~Agent`, `operator()`.
const FUNCTIONS: &str = r#"
(function_definition
  declarator: (function_declarator declarator: (_) @name)) @function
(function_definition
  declarator: (pointer_declarator
    declarator: (function_declarator declarator: (_) @name))) @function
"#;

const CALLS: &str = r#"
(call_expression function: (_) @callee) @call
"#;

const IMPORTS: &str = r#"
(preproc_include path: (_)) @import
"#;

const BUILTINS: &[&str] = &[
    "std::*", "printf", "fprintf", "snprintf", "puts", "malloc", "free", "memcpy", "memset",
    "strlen", "assert", "size", "begin", "end", "push_back", "emplace_back", "c_str",
];

pub struct CppRules;

impl LanguageRules for CppRules {
    fn queries(&self) -> QuerySources {
        QuerySources {
            functions: FUNCTIONS,
            calls: CALLS,
            imports: Some(IMPORTS),
            exports: None,
            extras: None,
            bindings: None,
        }
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS
    }

    /// Qualified names keep only the last segment: `Agent::run` → `run`.
    fn function_name(&self, _node: Node<'_>, name: Option<Node<'_>>, src: &[u8]) -> Option<String> {
        let full = text(name?, src);
        let last = full.rsplit("::").next().unwrap_or(full).trim();
        (!last.is_empty()).then(|| last.to_string())
    }

    fn params(&self, node: Node<'_>, src: &[u8]) -> Vec<String> {
        declarator_params(node, src)
    }

    fn imports(&self, node: Node<'_>, src: &[u8]) -> Vec<ImportRecord> {
        include_record(node, src).into_iter().collect()
    }
}
