//! Rust query sources and conventions

use super::{LanguageRules, QuerySources, has_child_kind, line_of, named_children, normalize_callee, text};
use codag_core::{ImportRecord, ImportedName};
use std::collections::HashSet;
use tree_sitter::Node;

const FUNCTIONS: &str = r#"
(function_item name: (identifier) @name) @function
"#;

const CALLS: &str = r#"
(call_expression function: (_) @callee) @call
(macro_invocation macro: (_) @callee) @call
"#;

const IMPORTS: &str = r#"
(use_declaration argument: (_)) @import
"#;

const BINDINGS: &str = r#"
(let_declaration pattern: (identifier) @name value: (_) @value) @binding
"#;

const BUILTINS: &[&str] = &[
    "println!", "print!", "eprintln!", "eprint!", "format!", "vec!", "write!", "writeln!",
    "assert!", "assert_eq!", "assert_ne!", "debug_assert!", "panic!", "todo!", "unimplemented!",
    "unreachable!", "matches!", "trace!", "debug!", "info!", "warn!", "error!", "Some", "Ok",
    "Err", "Box::new", "String::from", "Vec::new", "clone", "to_string", "to_owned", "unwrap",
    "expect", "into", "iter", "collect", "as_str", "len", "push", "is_empty",
];

pub struct RustRules;

impl LanguageRules for RustRules {
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

    fn callee(&self, call: Node<'_>, callee: Option<Node<'_>>, src: &[u8]) -> Option<String> {
        let callee = normalize_callee(text(callee?, src));
        if call.kind() == "macro_invocation" {
            Some(format!("{}!", callee))
        } else {
            Some(callee)
        }
    }

    fn imports(&self, node: Node<'_>, src: &[u8]) -> Vec<ImportRecord> {
        let mut records = Vec::new();
        if let Some(argument) = node.child_by_field_name("argument") {
            collect_use(argument, None, line_of(node), src, &mut records);
        }
        records
    }

    fn is_exported(
        &self,
        node: Node<'_>,
        _name: &str,
        _declared: Option<&HashSet<String>>,
        _src: &[u8],
    ) -> bool {
        has_child_kind(node, "visibility_modifier")
    }
}

fn join_path(prefix: Option<&str>, path: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}::{}", prefix, path),
        _ => path.to_string(),
    }
}

/// Flatten one use tree into records of `source::{names}`.
fn collect_use(node: Node<'_>, prefix: Option<&str>, line: u32, src: &[u8], out: &mut Vec<ImportRecord>) {
    match node.kind() {
        // `use a::b::c;` imports `c` from `a::b`.
        "scoped_identifier" => {
            let path = node.child_by_field_name("path").map(|p| text(p, src));
            let Some(name) = node.child_by_field_name("name") else {
                return;
            };
            let source = join_path(prefix, path.unwrap_or(""));
            let mut record = ImportRecord::new(source, line);
            record.names.push(ImportedName::new(text(name, src)));
            out.push(record);
        }
        "identifier" | "crate" | "super" | "self" => {
            let name = text(node, src);
            match prefix {
                Some(prefix) => {
                    let mut record = ImportRecord::new(prefix, line);
                    if name == "self" {
                        record.alias = prefix.rsplit("::").next().map(str::to_string);
                    } else {
                        record.names.push(ImportedName::new(name));
                    }
                    out.push(record);
                }
                None => {
                    let mut record = ImportRecord::new(name, line);
                    record.alias = Some(name.to_string());
                    out.push(record);
                }
            }
        }
        "use_as_clause" => {
            let (Some(path), Some(alias)) = (node.child_by_field_name("path"), node.child_by_field_name("alias"))
            else {
                return;
            };
            let alias = text(alias, src);
            let (source, name) = match path.kind() {
                "scoped_identifier" => {
                    let parent = path.child_by_field_name("path").map(|p| text(p, src)).unwrap_or("");
                    let name = path.child_by_field_name("name").map(|n| text(n, src)).unwrap_or("");
                    (join_path(prefix, parent), name)
                }
                _ => (prefix.unwrap_or("").to_string(), text(path, src)),
            };
            let mut record = ImportRecord::new(source, line);
            record.names.push(ImportedName::aliased(name, alias));
            out.push(record);
        }
        "scoped_use_list" => {
            let path = node.child_by_field_name("path").map(|p| text(p, src)).unwrap_or("");
            let nested = join_path(prefix, path);
            if let Some(list) = node.child_by_field_name("list") {
                for item in named_children(list) {
                    collect_use(item, Some(&nested), line, src, out);
                }
            }
        }
        "use_list" => {
            for item in named_children(node) {
                collect_use(item, prefix, line, src, out);
            }
        }
        "use_wildcard" => {
            let path = named_children(node)
                .first()
                .map(|p| text(*p, src).to_string())
                .unwrap_or_default();
            let mut record = ImportRecord::new(join_path(prefix, &path), line);
            record.names.push(ImportedName::new("*"));
            out.push(record);
        }
        _ => {}
    }
}
