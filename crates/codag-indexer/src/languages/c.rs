//! C query sources and conventions

use super::{LanguageRules, QuerySources, line_of, named_children, string_value, text};
use codag_core::{ImportRecord, ImportedName};
use tree_sitter::Node;

const FUNCTIONS: &str = r#"
(function_definition
  declarator: (function_declarator declarator: (identifier) @name)) @function
(function_definition
  declarator: (pointer_declarator
    declarator: (function_declarator declarator: (identifier) @name))) @function
"#;

const CALLS: &str = r#"
(call_expression function: (_) @callee) @call
"#;

const IMPORTS: &str = r#"
(preproc_include path: (_)) @import
"#;

const BUILTINS: &[&str] = &[
    "printf", "fprintf", "sprintf", "snprintf", "puts", "putchar", "malloc", "calloc", "realloc",
    "free", "memcpy", "memset", "memmove", "strlen", "strcpy", "strncpy", "strcmp", "strncmp",
    "strcat", "exit", "assert", "sizeof", "fopen", "fclose", "fread", "fwrite",
];

pub struct CRules;

impl LanguageRules for CRules {
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

    fn params(&self, node: Node<'_>, src: &[u8]) -> Vec<String> {
        declarator_params(node, src)
    }

    fn imports(&self, node: Node<'_>, src: &[u8]) -> Vec<ImportRecord> {
        include_record(node, src).into_iter().collect()
    }
}

/// Parameters found by following the declarator chain down to the
/// `function_declarator`.
pub(crate) fn declarator_params(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut declarator = node.child_by_field_name("declarator");
    while let Some(current) = declarator {
        if current.kind() == "function_declarator" {
            return current
                .child_by_field_name("parameters")
                .map(|list| {
                    named_children(list)
                        .into_iter()
                        .map(|p| super::collapse_whitespace(text(p, src)))
                        .collect()
                })
                .unwrap_or_default();
        }
        declarator = current.child_by_field_name("declarator");
    }
    Vec::new()
}

/// `#include "llm.h"` pulls in everything the header declares. System headers
/// (`<stdio.h>`) never resolve inside a repository and are skipped.
pub(crate) fn include_record(node: Node<'_>, src: &[u8]) -> Option<ImportRecord> {
    let path = node.child_by_field_name("path")?;
    let source = string_value(path, src)?;
    let mut record = ImportRecord::new(source, line_of(node));
    record.names.push(ImportedName::new("*"));
    Some(record)
}
