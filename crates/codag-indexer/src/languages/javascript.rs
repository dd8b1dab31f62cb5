//! JavaScript, TypeScript and TSX query sources and conventions

use super::{LanguageRules, QuerySources, child_of_kind, line_of, named_children, string_value, text};
use codag_core::{ImportRecord, ImportedName};
use std::collections::HashSet;
use tree_sitter::Node;

const FUNCTIONS: &str = r#"
(function_declaration name: (identifier) @name) @function
(generator_function_declaration name: (identifier) @name) @function
(method_definition name: (_) @name) @function
(variable_declarator
  name: (identifier) @name
  value: [(arrow_function) (function_expression)]) @function
"#;

const CALLS: &str = r#"
(call_expression function: (_) @callee) @call
(new_expression constructor: (_) @callee) @call
"#;

const IMPORTS: &str = r#"
(import_statement source: (string)) @import
(variable_declarator
  value: (call_expression
    function: (identifier) @require
    arguments: (arguments (string)))
  (#eq? @require "require")) @import
"#;

const EXPORTS: &str = r#"
(export_statement) @export
"#;

const BINDINGS: &str = r#"
(variable_declarator name: (identifier) @name value: (_) @value) @binding
(assignment_expression left: (_) @name right: (_) @value) @binding
"#;

const BUILTINS: &[&str] = &[
    "console.*", "JSON.*", "Object.*", "Array.*", "Math.*", "Promise.*", "Number.*", "String.*",
    "Date.*", "require", "parseInt", "parseFloat", "String", "Number", "Boolean", "Error",
    "setTimeout", "setInterval", "clearTimeout", "clearInterval", "push", "forEach", "map",
    "filter", "reduce", "join", "split", "slice", "includes", "then", "catch", "finally",
    "toString", "res.*", "useState", "useEffect", "useMemo", "useCallback", "useRef",
];

pub struct JavaScriptRules;

impl LanguageRules for JavaScriptRules {
    fn queries(&self) -> QuerySources {
        QuerySources {
            functions: FUNCTIONS,
            calls: CALLS,
            imports: Some(IMPORTS),
            exports: Some(EXPORTS),
            extras: None,
            bindings: Some(BINDINGS),
        }
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS
    }

    fn imports(&self, node: Node<'_>, src: &[u8]) -> Vec<ImportRecord> {
        match node.kind() {
            "import_statement" => es_import(node, src).into_iter().collect(),
            "variable_declarator" => require_import(node, src).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn exports(&self, node: Node<'_>, src: &[u8]) -> Vec<String> {
        let mut names = Vec::new();

        if let Some(declaration) = node.child_by_field_name("declaration") {
            match declaration.kind() {
                "lexical_declaration" | "variable_declaration" => {
                    for declarator in named_children(declaration) {
                        if let Some(name) = declarator.child_by_field_name("name") {
                            names.push(text(name, src).to_string());
                        }
                    }
                }
                _ => {
                    if let Some(name) = declaration.child_by_field_name("name") {
                        names.push(text(name, src).to_string());
                    }
                }
            }
        }

        // `export default generate`
        if let Some(value) = node.child_by_field_name("value") {
            if value.kind() == "identifier" {
                names.push(text(value, src).to_string());
            } else if let Some(name) = value.child_by_field_name("name") {
                names.push(text(name, src).to_string());
            }
        }

        if let Some(clause) = child_of_kind(node, &["export_clause"]) {
            for specifier in named_children(clause) {
                if let Some(name) = specifier.child_by_field_name("name") {
                    names.push(text(name, src).to_string());
                }
            }
        }

        if super::has_child_kind(node, "default") {
            names.push("default".to_string());
        }
        names
    }

    fn is_exported(
        &self,
        _node: Node<'_>,
        name: &str,
        declared: Option<&HashSet<String>>,
        _src: &[u8],
    ) -> bool {
        declared.is_some_and(|names| names.contains(name))
    }
}

/// `import a, { b as c } from './x'`, `import * as ns from 'y'`, `import './z'`.
fn es_import(node: Node<'_>, src: &[u8]) -> Option<ImportRecord> {
    let source = node.child_by_field_name("source")?;
    let mut record = ImportRecord::new(string_value(source, src)?, line_of(node));

    let Some(clause) = child_of_kind(node, &["import_clause"]) else {
        return Some(record);
    };
    for part in named_children(clause) {
        match part.kind() {
            // Default import: bound to the module.
            "identifier" => record.alias = Some(text(part, src).to_string()),
            "namespace_import" => {
                if let Some(name) = child_of_kind(part, &["identifier"]) {
                    record.alias = Some(text(name, src).to_string());
                }
            }
            "named_imports" => {
                for specifier in named_children(part) {
                    let Some(name) = specifier.child_by_field_name("name") else {
                        continue;
                    };
                    let name = text(name, src);
                    record.names.push(match specifier.child_by_field_name("alias") {
                        Some(alias) => ImportedName::aliased(name, text(alias, src)),
                        None => ImportedName::new(name),
                    });
                }
            }
            _ => {}
        }
    }
    Some(record)
}

/// `const x = require('./x')` or `const { a, b: c } = require('./x')`.
fn require_import(node: Node<'_>, src: &[u8]) -> Option<ImportRecord> {
    let call = node.child_by_field_name("value")?;
    let arguments = call.child_by_field_name("arguments")?;
    let source = named_children(arguments).into_iter().find_map(|arg| string_value(arg, src))?;
    let mut record = ImportRecord::new(source, line_of(node));

    let binding = node.child_by_field_name("name")?;
    match binding.kind() {
        "identifier" => record.alias = Some(text(binding, src).to_string()),
        "object_pattern" => {
            for property in named_children(binding) {
                match property.kind() {
                    "shorthand_property_identifier_pattern" => {
                        record.names.push(ImportedName::new(text(property, src)));
                    }
                    "pair_pattern" => {
                        let key = property.child_by_field_name("key");
                        let value = property.child_by_field_name("value");
                        if let (Some(key), Some(value)) = (key, value) {
                            record.names.push(ImportedName::aliased(text(key, src), text(value, src)));
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
    Some(record)
}
