//! Go query sources and conventions

use super::{LanguageRules, QuerySources, line_of, string_value, text};
use codag_core::ImportRecord;
use std::collections::HashSet;
use tree_sitter::Node;

const FUNCTIONS: &str = r#"
(function_declaration name: (identifier) @name) @function
(method_declaration name: (field_identifier) @name) @function
"#;

const CALLS: &str = r#"
(call_expression function: (_) @callee) @call
"#;

const IMPORTS: &str = r#"
(import_spec) @import
"#;

const BINDINGS: &str = r#"
(short_var_declaration
  left: (expression_list . (identifier) @name)
  right: (expression_list . (_) @value)) @binding
"#;

const BUILTINS: &[&str] = &[
    "len", "cap", "append", "make", "new", "panic", "recover", "copy", "delete", "close",
    "print", "println", "fmt.*", "log.*", "errors.*", "strings.*", "strconv.*", "json.*",
];

pub struct GoRules;

impl LanguageRules for GoRules {
    fn queries(&self) -> QuerySources {
        QuerySources {
            functions: FUNCTIONS,
            calls: CALLS,
            imports: Some(IMPORTS),
            exports: None,
            extras: None,
            bindings: Some(BINDINGS),
        }
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS
    }

    fn imports(&self, node: Node<'_>, src: &[u8]) -> Vec<ImportRecord> {
        let Some(path) = node.child_by_field_name("path").and_then(|p| string_value(p, src)) else {
            return Vec::new();
        };
        let mut record = ImportRecord::new(path.clone(), line_of(node));
        // Packages are referenced by their last path segment unless renamed.
        record.alias = match node.child_by_field_name("name") {
            Some(name) => Some(text(name, src).to_string()),
            None => path.rsplit('/').next().map(str::to_string),
        };
        vec![record]
    }

    fn is_exported(
        &self,
        _node: Node<'_>,
        name: &str,
        _declared: Option<&HashSet<String>>,
        _src: &[u8],
    ) -> bool {
        name.chars().next().is_some_and(char::is_uppercase)
    }
}
