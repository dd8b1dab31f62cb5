//! Lua query sources and conventions

use super::{
    LanguageRules, QuerySources, call_arguments, child_of_kind, line_of, named_children, normalize_callee,
    string_value, text,
};
use codag_core::ImportRecord;
use std::collections::HashSet;
use tree_sitter::Node;

// Both `function M.run()` and `local function run()`; names are read in code.
const FUNCTIONS: &str = r#"
(function_declaration) @function
"#;

const CALLS: &str = r#"
(function_call name: (_) @callee) @call
"#;

const IMPORTS: &str = r#"
(function_call
  name: (identifier) @require
  (#eq? @require "require")) @import
"#;

const BUILTINS: &[&str] = &[
    "print", "pairs", "ipairs", "tostring", "tonumber", "type", "error", "assert", "pcall",
    "xpcall", "require", "setmetatable", "getmetatable", "select", "unpack", "string.*",
    "table.*", "math.*", "os.*", "io.*",
];

pub struct LuaRules;

impl LanguageRules for LuaRules {
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

    /// `function M.run()` → `run`, `function obj:send()` → `send`.
    fn function_name(&self, node: Node<'_>, _name: Option<Node<'_>>, src: &[u8]) -> Option<String> {
        let name = node
            .child_by_field_name("name")
            .or_else(|| child_of_kind(node, &["identifier"]))?;
        let callee = normalize_callee(text(name, src));
        let last = codag_core::simple_name(&callee);
        (!last.is_empty()).then(|| last.to_string())
    }

    fn imports(&self, node: Node<'_>, src: &[u8]) -> Vec<ImportRecord> {
        let Some(module) = call_arguments(node).into_iter().find_map(|arg| string_value(arg, src)) else {
            return Vec::new();
        };
        let mut record = ImportRecord::new(module, line_of(node));
        record.alias = binding_name(node, src);
        vec![record]
    }

    fn is_exported(
        &self,
        node: Node<'_>,
        _name: &str,
        _declared: Option<&HashSet<String>>,
        _src: &[u8],
    ) -> bool {
        node.child(0).is_none_or(|first| first.kind() != "local")
    }
}

/// `local llm = require("llm")` binds the module to `llm`.
fn binding_name(call: Node<'_>, src: &[u8]) -> Option<String> {
    let mut current = call.parent();
    for _ in 0..3 {
        let node = current?;
        if matches!(node.kind(), "assignment_statement" | "variable_declaration") {
            let statement = match node.kind() {
                "variable_declaration" => child_of_kind(node, &["assignment_statement"]).unwrap_or(node),
                _ => node,
            };
            let variables = named_children(statement).into_iter().next()?;
            let first = named_children(variables).into_iter().next().unwrap_or(variables);
            return Some(text(first, src).to_string());
        }
        current = node.parent();
    }
    None
}
