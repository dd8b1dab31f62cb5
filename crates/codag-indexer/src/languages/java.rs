//! Java query sources and conventions

use super::{LanguageRules, QuerySources, has_child_kind, line_of, normalize_callee, text};
use codag_core::{ImportRecord, ImportedName};
use tree_sitter::Node;

const FUNCTIONS: &str = r#"
(method_declaration name: (identifier) @name) @function
(constructor_declaration name: (identifier) @name) @function
"#;

const CALLS: &str = r#"
(method_invocation name: (identifier) @callee) @call
(object_creation_expression type: (_) @callee) @call
"#;

const IMPORTS: &str = r#"
(import_declaration [(scoped_identifier) (identifier)] @source) @import
"#;

const BINDINGS: &str = r#"
(variable_declarator name: (identifier) @name value: (_) @value) @binding
"#;

const BUILTINS: &[&str] = &[
    "System.out.println", "System.out.print", "System.out.printf", "System.err.println",
    "String.format", "String.valueOf", "Integer.parseInt", "equals", "toString", "hashCode",
    "getClass", "size", "isEmpty", "List.of", "Map.of", "Objects.*", "Arrays.*", "Collections.*",
    "Math.*", "log.*", "logger.*", "LOG.*", "LOGGER.*",
];

pub struct JavaRules;

impl LanguageRules for JavaRules {
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

    /// `client.chat().create(...)` is recorded as `client.chat().create`.
    fn callee(&self, call: Node<'_>, callee: Option<Node<'_>>, src: &[u8]) -> Option<String> {
        let name = normalize_callee(text(callee?, src));
        match call.child_by_field_name("object") {
            Some(object) => Some(format!("{}.{}", normalize_callee(text(object, src)), name)),
            None => Some(name),
        }
    }

    fn imports(&self, node: Node<'_>, src: &[u8]) -> Vec<ImportRecord> {
        let Some(path) = node.named_child(0) else {
            return Vec::new();
        };
        let path = text(path, src);
        let line = line_of(node);

        // `import com.acme.llm.*;`
        if has_child_kind(node, "asterisk") {
            let mut record = ImportRecord::new(path, line);
            record.names.push(ImportedName::new("*"));
            return vec![record];
        }

        let (package, class) = match path.rsplit_once('.') {
            Some((package, class)) => (package, class),
            None => ("", path),
        };
        let mut record = ImportRecord::new(package, line);
        record.names.push(ImportedName::new(class));
        vec![record]
    }
}
