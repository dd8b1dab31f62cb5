//! Per-language query sources and syntax conventions

pub mod c;
pub mod cpp;
pub mod go;
pub mod java;
pub mod javascript;
pub mod lua;
pub mod python;
pub mod rust;
pub mod swift;

use codag_core::{ImportRecord, Language, simple_name};
use std::collections::HashSet;
use tree_sitter::Node;

/// Query sources for one language.
///
/// Patterns tag the nodes the extractor reads with fixed capture names:
/// `@function`/`@name` for definitions, `@call`/`@callee` for calls, `@import`,
/// `@export`, `@decorated`/`@name` for extras and `@binding`/`@name`/`@value`
/// for variable bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuerySources {
    pub functions: &'static str,
    pub calls: &'static str,
    pub imports: Option<&'static str>,
    pub exports: Option<&'static str>,
    pub extras: Option<&'static str>,
    pub bindings: Option<&'static str>,
}

/// Syntax knowledge the generic extractor defers to, one implementation per grammar.
pub trait LanguageRules: Send + Sync {
    fn queries(&self) -> QuerySources;

    /// Calls dropped from call lists: bare names, full texts, or `prefix.*`.
    fn builtins(&self) -> &'static [&'static str] {
        &[]
    }

    fn function_name(&self, _node: Node<'_>, name: Option<Node<'_>>, src: &[u8]) -> Option<String> {
        name.map(|n| collapse_whitespace(text(n, src)))
    }

    fn params(&self, node: Node<'_>, src: &[u8]) -> Vec<String> {
        let list = node.child_by_field_name("parameters").or_else(|| {
            let value = node.child_by_field_name("value")?;
            value
                .child_by_field_name("parameters")
                .or_else(|| value.child_by_field_name("parameter"))
        });
        match list {
            Some(list) if list.kind() == "identifier" => vec![text(list, src).to_string()],
            Some(list) => named_children(list)
                .into_iter()
                .map(|p| collapse_whitespace(text(p, src)))
                .collect(),
            None => Vec::new(),
        }
    }

    fn is_async(&self, node: Node<'_>, src: &[u8]) -> bool {
        has_async_marker(node, src)
            || node
                .child_by_field_name("value")
                .is_some_and(|value| has_async_marker(value, src))
    }

    /// Normalised callee text of a call node.
    fn callee(&self, _call: Node<'_>, callee: Option<Node<'_>>, src: &[u8]) -> Option<String> {
        callee.map(|n| normalize_callee(text(n, src)))
    }

    /// Import records for one `@import` node.
    fn imports(&self, _node: Node<'_>, _src: &[u8]) -> Vec<ImportRecord> {
        Vec::new()
    }

    /// Names declared exported by one `@export` node.
    fn exports(&self, _node: Node<'_>, _src: &[u8]) -> Vec<String> {
        Vec::new()
    }

    /// `declared` holds the names found by the exports query, `None` when the
    /// file declared nothing.
    fn is_exported(
        &self,
        _node: Node<'_>,
        _name: &str,
        _declared: Option<&HashSet<String>>,
        _src: &[u8],
    ) -> bool {
        true
    }

    /// Decorator call expressions attached to one `@decorated` node.
    fn decorators<'t>(&self, _node: Node<'t>) -> Vec<Node<'t>> {
        Vec::new()
    }
}

/// Rules for a language. Every [`Language`] has an implementation.
pub fn rules_for(language: Language) -> Box<dyn LanguageRules> {
    match language {
        Language::Python => Box::new(python::PythonRules),
        Language::TypeScript | Language::Tsx | Language::JavaScript => Box::new(javascript::JavaScriptRules),
        Language::Go => Box::new(go::GoRules),
        Language::Rust => Box::new(rust::RustRules),
        Language::C => Box::new(c::CRules),
        Language::Cpp => Box::new(cpp::CppRules),
        Language::Swift => Box::new(swift::SwiftRules),
        Language::Java => Box::new(java::JavaRules),
        Language::Lua => Box::new(lua::LuaRules),
    }
}

/// Whether `callee` is on a builtin list.
pub fn is_builtin(builtins: &[&str], callee: &str) -> bool {
    let name = simple_name(callee);
    builtins.iter().any(|entry| {
        if let Some(prefix) = entry.strip_suffix('*') {
            callee.starts_with(prefix)
        } else if entry.contains(['.', ':']) {
            callee == *entry
        } else {
            name == *entry || callee == *entry
        }
    })
}

pub fn text<'s>(node: Node<'_>, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or("")
}

/// 1-based line of the node start.
pub fn line_of(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Callee text with whitespace removed and optional chaining folded:
/// `client\n  ?.chat.create` → `client.chat.create`.
pub fn normalize_callee(text: &str) -> String {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    compact.replace("?.", ".").replace("!.", ".")
}

/// Named children, skipping comments.
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.kind().contains("comment"))
        .collect()
}

pub fn child_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| kinds.contains(&child.kind()));
    found
}

pub fn has_child_kind(node: Node<'_>, kind: &str) -> bool {
    child_of_kind(node, &[kind]).is_some()
}

fn has_async_marker(node: Node<'_>, src: &[u8]) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| {
        child.kind() == "async"
            || (child.kind() == "function_modifiers" && text(child, src).contains("async"))
    });
    found
}

/// Argument nodes of a call, in source order.
pub fn call_arguments(call: Node<'_>) -> Vec<Node<'_>> {
    let list = call
        .child_by_field_name("arguments")
        .or_else(|| child_of_kind(call, &["argument_list", "arguments", "value_arguments"]));

    if let Some(list) = list {
        return match list.kind() {
            // Lua `require "x"`: the string is the whole argument list.
            "string" => vec![list],
            _ => named_children(list),
        };
    }

    // Swift: `call_suffix` wraps `value_arguments` and any trailing closure.
    let mut args = Vec::new();
    if let Some(suffix) = child_of_kind(call, &["call_suffix"]) {
        for child in named_children(suffix) {
            match child.kind() {
                "value_arguments" => {
                    for argument in named_children(child) {
                        let value = named_children(argument).last().copied().unwrap_or(argument);
                        args.push(value);
                    }
                }
                _ => args.push(child),
            }
        }
    }
    args
}

const STRING_KINDS: &[&str] = &[
    "string",
    "string_literal",
    "template_string",
    "interpreted_string_literal",
    "raw_string_literal",
    "line_string_literal",
    "multi_line_string_literal",
];

pub fn is_string(node: Node<'_>) -> bool {
    STRING_KINDS.contains(&node.kind())
}

/// Content of a string literal node, quotes removed.
pub fn string_value(node: Node<'_>, src: &[u8]) -> Option<String> {
    if !is_string(node) {
        return None;
    }
    Some(strip_quotes(text(node, src)).to_string())
}

/// Remove string prefixes (`f`, `r`, `b`, `u`) and matching quotes.
pub fn strip_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    let unprefixed = trimmed.trim_start_matches(['f', 'F', 'r', 'R', 'b', 'B', 'u', 'U']);
    let body = if unprefixed.starts_with(['"', '\'', '`']) {
        unprefixed
    } else {
        trimmed
    };
    for quote in ["\"\"\"", "'''", "\"", "'", "`"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return &body[quote.len()..body.len() - quote.len()];
        }
    }
    if let Some(inner) = body.strip_prefix("[[").and_then(|b| b.strip_suffix("]]")) {
        return inner;
    }
    body
}

/// An inline function literal passed as an argument.
pub fn is_function_literal(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "arrow_function"
            | "function_expression"
            | "function"
            | "lambda"
            | "func_literal"
            | "closure_expression"
            | "lambda_expression"
            | "lambda_literal"
            | "function_definition"
    )
}

/// A reference to a named function: `getUsers`, `handlers.chat`.
pub fn is_function_reference(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "identifier"
            | "simple_identifier"
            | "member_expression"
            | "attribute"
            | "selector_expression"
            | "field_expression"
            | "scoped_identifier"
            | "navigation_expression"
            | "dot_index_expression"
            | "method_reference"
    )
}
