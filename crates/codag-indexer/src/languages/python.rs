//! Python query sources and conventions

use super::{LanguageRules, QuerySources, named_children, string_value, text};
use codag_core::{ImportRecord, ImportedName};
use std::collections::HashSet;
use tree_sitter::Node;

const FUNCTIONS: &str = r#"
(function_definition name: (identifier) @name) @function
"#;

const CALLS: &str = r#"
(call function: (_) @callee) @call
"#;

const IMPORTS: &str = r#"
[(import_statement) (import_from_statement)] @import
"#;

// `__all__` overrides the underscore convention.
const EXPORTS: &str = r#"
(assignment
  left: (identifier) @name
  right: (list) @value
  (#eq? @name "__all__")) @export
"#;

const EXTRAS: &str = r#"
(decorated_definition
  definition: (function_definition name: (identifier) @name)) @decorated
"#;

const BINDINGS: &str = r#"
(assignment left: (_) @name right: (_) @value) @binding
"#;

const BUILTINS: &[&str] = &[
    "print", "len", "str", "int", "float", "bool", "list", "dict", "set", "tuple", "range",
    "enumerate", "zip", "map", "filter", "sorted", "reversed", "isinstance", "issubclass",
    "hasattr", "getattr", "setattr", "super", "open", "type", "repr", "min", "max", "sum", "any",
    "all", "abs", "round", "iter", "next", "id", "hash", "vars", "dir", "input", "format",
    "append", "extend", "items", "keys", "values", "join", "split", "strip", "replace",
    "startswith", "endswith", "lower", "upper", "encode", "decode", "pop", "copy",
    "logging.*", "logger.*", "log.*", "json.*", "os.path.*", "os.environ.*", "time.*",
];

pub struct PythonRules;

impl LanguageRules for PythonRules {
    fn queries(&self) -> QuerySources {
        QuerySources {
            functions: FUNCTIONS,
            calls: CALLS,
            imports: Some(IMPORTS),
            exports: Some(EXPORTS),
            extras: Some(EXTRAS),
            bindings: Some(BINDINGS),
        }
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS
    }

    fn imports(&self, node: Node<'_>, src: &[u8]) -> Vec<ImportRecord> {
        let line = super::line_of(node);
        let mut cursor = node.walk();

        match node.kind() {
            "import_statement" => node
                .children_by_field_name("name", &mut cursor)
                .filter_map(|name| {
                    let (module, alias) = imported_name(name, src)?;
                    let mut record = ImportRecord::new(module.clone(), line);
                    // `import a.b` binds `a.b`; `import a.b as c` binds `c`.
                    record.alias = Some(alias.unwrap_or(module));
                    Some(record)
                })
                .collect(),
            "import_from_statement" => {
                let Some(module) = node.child_by_field_name("module_name") else {
                    return Vec::new();
                };
                let mut record = ImportRecord::new(text(module, src), line);
                record.names = node
                    .children_by_field_name("name", &mut cursor)
                    .filter_map(|name| {
                        let (name, alias) = imported_name(name, src)?;
                        Some(match alias {
                            Some(alias) => ImportedName::aliased(name, alias),
                            None => ImportedName::new(name),
                        })
                    })
                    .collect();
                if super::has_child_kind(node, "wildcard_import") {
                    record.names.push(ImportedName::new("*"));
                }
                vec![record]
            }
            _ => Vec::new(),
        }
    }

    fn exports(&self, node: Node<'_>, src: &[u8]) -> Vec<String> {
        node.child_by_field_name("right")
            .map(|list| {
                named_children(list)
                    .into_iter()
                    .filter_map(|item| string_value(item, src))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn is_exported(
        &self,
        _node: Node<'_>,
        name: &str,
        declared: Option<&HashSet<String>>,
        _src: &[u8],
    ) -> bool {
        match declared {
            Some(names) => names.contains(name),
            None => !name.starts_with('_'),
        }
    }

    fn decorators<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        let decorators: Vec<Node<'t>> = node
            .children(&mut cursor)
            .filter(|child| child.kind() == "decorator")
            .filter_map(|decorator| decorator.named_child(0))
            .filter(|expression| expression.kind() == "call")
            .collect();
        decorators
    }
}

/// `dotted_name` or `aliased_import` → (name, alias).
fn imported_name(node: Node<'_>, src: &[u8]) -> Option<(String, Option<String>)> {
    match node.kind() {
        "dotted_name" | "identifier" => Some((text(node, src).to_string(), None)),
        "aliased_import" => {
            let name = node.child_by_field_name("name")?;
            let alias = node.child_by_field_name("alias").map(|a| text(a, src).to_string());
            Some((text(name, src).to_string(), alias))
        }
        _ => None,
    }
}
