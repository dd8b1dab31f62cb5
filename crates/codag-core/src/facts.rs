//! Structural facts extracted from source files

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Languages with a bundled grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    TypeScript,
    Tsx,
    JavaScript,
    Go,
    Rust,
    C,
    Cpp,
    Swift,
    Java,
    Lua,
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::Python,
        Language::TypeScript,
        Language::Tsx,
        Language::JavaScript,
        Language::Go,
        Language::Rust,
        Language::C,
        Language::Cpp,
        Language::Swift,
        Language::Java,
        Language::Lua,
    ];

    /// Detect language from file extension. Unmapped extensions yield `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "py" => Some(Language::Python),
            "ts" => Some(Language::TypeScript),
            "tsx" => Some(Language::Tsx),
            "js" | "jsx" => Some(Language::JavaScript),
            "go" => Some(Language::Go),
            "rs" => Some(Language::Rust),
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "hpp" => Some(Language::Cpp),
            "swift" => Some(Language::Swift),
            "java" => Some(Language::Java),
            "lua" => Some(Language::Lua),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::JavaScript => "javascript",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Swift => "swift",
            Language::Java => "java",
            Language::Lua => "lua",
        }
    }

    /// JavaScript, TypeScript and TSX share query sources and conventions.
    pub fn is_js_family(&self) -> bool {
        matches!(self, Language::JavaScript | Language::TypeScript | Language::Tsx)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One occurrence of a call inside a function body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub callee: String,
    pub line: u32,
}

/// A function (or method) definition and what it calls.
///
/// `name` is unique within a file; the same name may appear in many files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDef {
    pub name: String,
    pub file: PathBuf,
    pub start_line: u32,
    pub end_line: u32,
    pub params: Vec<String>,
    pub is_async: bool,
    pub is_exported: bool,
    /// Callee texts in first-seen order, without duplicates.
    pub calls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_sites: Vec<CallSite>,
    /// Calls that matched the LLM call predicate directly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub llm_calls: Vec<String>,
    /// True when this function or anything it transitively calls talks to an LLM.
    #[serde(rename = "hasLLMCall")]
    pub has_llm_call: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http_calls: Vec<HttpClientCall>,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>, start_line: u32, end_line: u32) -> Self {
        FunctionDef {
            name: name.into(),
            file: file.into(),
            start_line,
            end_line,
            params: Vec::new(),
            is_async: false,
            is_exported: false,
            calls: Vec::new(),
            call_sites: Vec::new(),
            llm_calls: Vec::new(),
            has_llm_call: false,
            http_calls: Vec::new(),
        }
    }

    /// Whether the function itself contains an LLM call, as opposed to
    /// inheriting the flag from a callee.
    pub fn has_direct_llm_call(&self) -> bool {
        !self.llm_calls.is_empty()
    }

    /// First line at which `callee` is called, falling back to the definition line.
    pub fn call_line(&self, callee: &str) -> u32 {
        self.call_sites
            .iter()
            .find(|site| site.callee == callee)
            .map(|site| site.line)
            .unwrap_or(self.start_line)
    }
}

/// A name pulled in by an import, with its local alias if renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedName {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ImportedName {
    pub fn new(name: impl Into<String>) -> Self {
        ImportedName { name: name.into(), alias: None }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        ImportedName {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// The name the importing file uses.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// One import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Module specifier exactly as written (quotes removed).
    pub source: String,
    pub names: Vec<ImportedName>,
    /// Name the whole module is bound to (`import x as y`, `import * as y`, default import).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub line: u32,
}

impl ImportRecord {
    pub fn new(source: impl Into<String>, line: u32) -> Self {
        ImportRecord {
            source: source.into(),
            names: Vec::new(),
            alias: None,
            line,
        }
    }
}

/// An outgoing HTTP request found in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpClientCall {
    pub file: PathBuf,
    pub line: u32,
    pub function: String,
    pub method: String,
    pub raw_path: String,
    pub path: String,
}

/// How a route handler was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteSource {
    Decorator,
    RouterCall,
    FileConvention,
}

/// A server-side function bound to an HTTP method and path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteHandler {
    pub file: PathBuf,
    pub line: u32,
    pub function: String,
    pub method: String,
    pub raw_path: String,
    pub path: String,
    pub detected_by: RouteSource,
}

/// How confidently a client call was paired with a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    Exact,
    Fuzzy,
}

/// A client call paired with the handler that serves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConnection {
    pub client: HttpClientCall,
    pub handler: HttpRouteHandler,
    pub confidence: MatchConfidence,
}

/// The calling side of a cross-file call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerRef {
    pub file: PathBuf,
    pub function: String,
    pub line: u32,
}

/// The resolved target of a cross-file call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalleeRef {
    pub file: PathBuf,
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

/// A call whose target is defined in a different file than the call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossFileCall {
    pub caller: CallerRef,
    pub callee: CalleeRef,
}

/// The last segment of a callee expression: `client.chat.create` → `create`.
pub fn simple_name(callee: &str) -> &str {
    let trimmed = callee.trim_end_matches("()");
    trimmed
        .rsplit(|c: char| c == '.' || c == ':' || c == '>')
        .next()
        .unwrap_or(trimmed)
}

/// Everything before the last segment of a callee expression.
pub fn receiver(callee: &str) -> Option<&str> {
    let idx = callee.rfind(|c: char| c == '.' || c == ':' || c == '>')?;
    let head = callee[..idx].trim_end_matches(|c: char| c == ':' || c == '-');
    if head.is_empty() {
        None
    } else {
        Some(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_table() {
        assert_eq!(Language::from_path(Path::new("a/b.py")), Some(Language::Python));
        assert_eq!(Language::from_path(Path::new("x.tsx")), Some(Language::Tsx));
        assert_eq!(Language::from_path(Path::new("x.jsx")), Some(Language::JavaScript));
        assert_eq!(Language::from_path(Path::new("x.h")), Some(Language::C));
        assert_eq!(Language::from_path(Path::new("x.hpp")), Some(Language::Cpp));
        assert_eq!(Language::from_path(Path::new("x.lua")), Some(Language::Lua));
        assert_eq!(Language::from_path(Path::new("README.md")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_simple_name_and_receiver() {
        assert_eq!(simple_name("client.chat.completions.create"), "create");
        assert_eq!(simple_name("std::fs::read"), "read");
        assert_eq!(simple_name("obj->run"), "run");
        assert_eq!(simple_name("generate"), "generate");
        assert_eq!(receiver("client.chat.create"), Some("client.chat"));
        assert_eq!(receiver("std::fs::read"), Some("std::fs"));
        assert_eq!(receiver("obj->run"), Some("obj"));
        assert_eq!(receiver("generate"), None);
    }
}
