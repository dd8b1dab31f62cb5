//! Swift query sources and conventions

use super::{LanguageRules, QuerySources, line_of, named_children, normalize_callee, text};
use codag_core::ImportRecord;
use tree_sitter::Node;

const FUNCTIONS: &str = r#"
(function_declaration name: (simple_identifier) @name) @function
"#;

// Call expressions have no field names; the callee is the first named child.
const CALLS: &str = r#"
(call_expression) @call
"#;

const IMPORTS: &str = r#"
(import_declaration) @import
"#;

const BUILTINS: &[&str] = &[
    "print", "debugPrint", "fatalError", "precondition", "assert", "String", "Int", "Double",
    "Array", "Dictionary", "min", "max", "append", "map", "filter", "reduce", "forEach",
];

pub struct SwiftRules;

impl LanguageRules for SwiftRules {
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
        named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "parameter")
            .map(|p| super::collapse_whitespace(text(p, src)))
            .collect()
    }

    fn callee(&self, call: Node<'_>, _callee: Option<Node<'_>>, src: &[u8]) -> Option<String> {
        let head = call.named_child(0)?;
        if head.kind() == "call_suffix" {
            return None;
        }
        let callee = normalize_callee(text(head, src));
        (!callee.is_empty()).then_some(callee)
    }

    fn imports(&self, node: Node<'_>, src: &[u8]) -> Vec<ImportRecord> {
        let module = text(node, src)
            .split_whitespace()
            .skip_while(|word| *word != "import")
            .nth(1)
            .map(str::to_string);
        match module {
            Some(module) => {
                let mut record = ImportRecord::new(module.clone(), line_of(node));
                record.alias = Some(module);
                vec![record]
            }
            None => Vec::new(),
        }
    }
}
