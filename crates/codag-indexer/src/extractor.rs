//! Structural extraction over compiled per-language queries
//!
//! One [`Extractor`] holds the compiled queries for every language plus the
//! injected LLM and HTTP predicates. It is immutable and shareable; parsing
//! goes through a [`ParserManager`] lent by the caller.

use crate::config::AnalysisConfig;
use crate::error::{IndexError, Result};
use crate::http::{HTTP_VERBS, HttpObjects, http_verb, normalize_path};
use crate::languages::{
    self, LanguageRules, call_arguments, is_builtin, is_function_literal, is_function_reference, line_of,
    named_children, normalize_callee, string_value, text,
};
use crate::parser::{self, ParserManager};
use crate::patterns::{LlmMatcher, PatternSet};
use crate::routes::{RouteConvention, default_conventions};
use codag_core::{
    CallSite, FunctionDef, HttpClientCall, HttpRouteHandler, ImportRecord, Language, RouteSource, receiver,
    simple_name,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use streaming_iterator::StreamingIterator;
use tracing::{debug, warn};
use tree_sitter::{Node, Query, QueryCursor, Tree};

/// Function name recorded for calls outside any function.
pub const MODULE_SCOPE: &str = "<module>";

/// Everything extracted from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStructure {
    pub file: PathBuf,
    pub language: Option<Language>,
    pub functions: Vec<FunctionDef>,
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<String>,
    pub route_handlers: Vec<HttpRouteHandler>,
    pub http_calls: Vec<HttpClientCall>,
}

impl FileStructure {
    pub fn empty(file: impl Into<PathBuf>) -> Self {
        FileStructure {
            file: file.into(),
            language: None,
            functions: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            route_handlers: Vec::new(),
            http_calls: Vec::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.imports.is_empty()
            && self.exports.is_empty()
            && self.route_handlers.is_empty()
            && self.http_calls.is_empty()
    }
}

/// A call classified as talking to an LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmCallSite {
    /// Enclosing function, [`MODULE_SCOPE`] at top level.
    pub function: String,
    pub callee: String,
    pub line: u32,
}

/// The lighter enrichment view of a file: which variables hold LLM clients
/// and which calls reach an LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    pub file: PathBuf,
    pub language: Option<Language>,
    pub might_contain_llm: bool,
    pub llm_variables: Vec<String>,
    pub llm_calls: Vec<LlmCallSite>,
}

impl FileAnalysis {
    fn empty(file: &Path) -> Self {
        FileAnalysis {
            file: file.to_path_buf(),
            language: None,
            might_contain_llm: false,
            llm_variables: Vec::new(),
            llm_calls: Vec::new(),
        }
    }
}

/// Result of one scan, shared by the structure and analysis views.
pub(crate) struct Scan {
    pub structure: FileStructure,
    pub llm_variables: Vec<String>,
    pub llm_sites: Vec<LlmCallSite>,
    pub might_contain_llm: bool,
}

struct CompiledQueries {
    functions: Option<Query>,
    calls: Option<Query>,
    imports: Option<Query>,
    exports: Option<Query>,
    extras: Option<Query>,
    bindings: Option<Query>,
}

struct LanguageEntry {
    rules: Box<dyn LanguageRules>,
    queries: CompiledQueries,
}

/// Compiles queries once and runs them over parse trees.
pub struct Extractor {
    languages: HashMap<Language, LanguageEntry>,
    matcher: Arc<dyn LlmMatcher>,
    http: HttpObjects,
    conventions: Vec<Box<dyn RouteConvention>>,
    track_bindings: bool,
}

impl Extractor {
    /// Build from config, compiling its LLM patterns.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let matcher = PatternSet::from_config(&config.llm)?;
        Ok(Self::with_matcher(Arc::new(matcher), config))
    }

    pub fn with_matcher(matcher: Arc<dyn LlmMatcher>, config: &AnalysisConfig) -> Self {
        let languages: HashMap<Language, LanguageEntry> = Language::ALL
            .into_iter()
            .map(|language| (language, compile_language(language)))
            .collect();
        Extractor {
            languages,
            matcher,
            http: HttpObjects::from_config(&config.http),
            conventions: default_conventions(),
            track_bindings: config.llm.track_bindings,
        }
    }

    pub fn with_conventions(mut self, conventions: Vec<Box<dyn RouteConvention>>) -> Self {
        self.conventions = conventions;
        self
    }

    pub fn matcher(&self) -> &dyn LlmMatcher {
        self.matcher.as_ref()
    }

    /// Whether `language` has at least its function and call queries.
    pub fn supports(&self, language: Language) -> bool {
        self.languages
            .get(&language)
            .is_some_and(|entry| entry.queries.functions.is_some() && entry.queries.calls.is_some())
    }

    /// Functions, imports, exports, route handlers and HTTP client calls of one
    /// file. Unsupported or unparseable files yield an empty structure.
    pub fn extract_file_structure(&self, parsers: &mut ParserManager, code: &str, path: &Path) -> FileStructure {
        match self.scan_file(parsers, code, path, false) {
            Some(scan) => scan.structure,
            None => FileStructure::empty(path),
        }
    }

    /// LLM-related variables and calls of one file.
    pub fn extract_file_analysis(&self, parsers: &mut ParserManager, code: &str, path: &Path) -> FileAnalysis {
        match self.scan_file(parsers, code, path, false) {
            Some(scan) => FileAnalysis {
                file: path.to_path_buf(),
                language: scan.structure.language,
                might_contain_llm: scan.might_contain_llm,
                llm_variables: scan.llm_variables,
                llm_calls: scan.llm_sites,
            },
            None => FileAnalysis::empty(path),
        }
    }

    /// Parse and scan. `cached` selects the incremental per-path tree cache.
    pub(crate) fn scan_file(
        &self,
        parsers: &mut ParserManager,
        code: &str,
        path: &Path,
        cached: bool,
    ) -> Option<Scan> {
        let language = parsers.get_language_for_file(path)?;
        if code.trim().is_empty() {
            return None;
        }
        let entry = self.languages.get(&language)?;

        let tree = match parsers.parse(code, language, cached.then_some(path)) {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                return None;
            }
        };
        Some(self.scan(entry, tree.tree(), code, path, language))
    }

    fn scan(&self, entry: &LanguageEntry, tree: &Tree, code: &str, path: &Path, language: Language) -> Scan {
        let src = code.as_bytes();
        let root = tree.root_node();
        let rules = entry.rules.as_ref();
        let queries = &entry.queries;

        let mut functions: Vec<FunctionDef> = Vec::new();
        let mut spans: Vec<Span> = Vec::new();
        let mut index_of: HashMap<String, usize> = HashMap::new();
        let mut definition_nodes: Vec<Node<'_>> = Vec::new();

        // Definitions. A repeated name folds into the first definition.
        if let Some(query) = &queries.functions {
            for captures in run(query, root, src) {
                let Some(node) = capture(query, &captures, "function") else {
                    continue;
                };
                let Some(name) = rules.function_name(node, capture(query, &captures, "name"), src) else {
                    continue;
                };
                let index = match index_of.get(&name) {
                    Some(&index) => index,
                    None => {
                        let mut def = FunctionDef::new(name.clone(), path, line_of(node), end_line(node));
                        def.params = rules.params(node, src);
                        def.is_async = rules.is_async(node, src);
                        index_of.insert(name, functions.len());
                        functions.push(def);
                        definition_nodes.push(node);
                        functions.len() - 1
                    }
                };
                spans.push(Span::of(node, index));
            }
        }

        // Exports.
        let mut declared: Option<HashSet<String>> = None;
        if let Some(query) = &queries.exports {
            for captures in run(query, root, src) {
                if let Some(node) = capture(query, &captures, "export") {
                    declared.get_or_insert_with(HashSet::new).extend(rules.exports(node, src));
                }
            }
        }
        for (def, node) in functions.iter_mut().zip(&definition_nodes) {
            def.is_exported = rules.is_exported(*node, &def.name, declared.as_ref(), src);
        }
        let mut exports: BTreeSet<String> = declared.clone().unwrap_or_default().into_iter().collect();
        exports.extend(functions.iter().filter(|f| f.is_exported).map(|f| f.name.clone()));

        // Imports.
        let mut imports = Vec::new();
        if let Some(query) = &queries.imports {
            for captures in run(query, root, src) {
                if let Some(node) = capture(query, &captures, "import") {
                    imports.extend(rules.imports(node, src));
                }
            }
        }

        // Calls.
        let mut calls: Vec<CallNode<'_>> = Vec::new();
        if let Some(query) = &queries.calls {
            for captures in run(query, root, src) {
                let Some(node) = capture(query, &captures, "call") else {
                    continue;
                };
                let Some(callee) = rules.callee(node, capture(query, &captures, "callee"), src) else {
                    continue;
                };
                if !callee.is_empty() {
                    calls.push(CallNode { node, callee });
                }
            }
        }

        // Route registrations on router objects. Inline handlers become
        // functions named after their route so their calls have an owner.
        let mut handlers = Vec::new();
        let mut registrations: HashSet<usize> = HashSet::new();
        for call in &calls {
            let args = call_arguments(call.node);
            let Some(route) = self.router_route(&call.callee, &args, src) else {
                continue;
            };
            let function = match route.handler {
                Handler::Named(name) => name,
                Handler::Inline(node) => {
                    let name = format!("{} {}", route.method, route.path);
                    let index = *index_of.entry(name.clone()).or_insert_with(|| {
                        functions.push(FunctionDef::new(name.clone(), path, line_of(node), end_line(node)));
                        functions.len() - 1
                    });
                    spans.push(Span::of(node, index));
                    name
                }
            };
            registrations.insert(call.node.id());
            handlers.push(HttpRouteHandler {
                file: path.to_path_buf(),
                line: line_of(call.node),
                function,
                method: route.method.to_string(),
                raw_path: route.raw_path,
                path: route.path,
                detected_by: RouteSource::RouterCall,
            });
        }

        // Decorator routes.
        if let Some(query) = &queries.extras {
            for captures in run(query, root, src) {
                let Some(node) = capture(query, &captures, "decorated") else {
                    continue;
                };
                let Some(name) = capture(query, &captures, "name").map(|n| text(n, src).to_string()) else {
                    continue;
                };
                for decorator in rules.decorators(node) {
                    let Some(callee) = decorator.child_by_field_name("function") else {
                        continue;
                    };
                    let callee = normalize_callee(text(callee, src));
                    let args = call_arguments(decorator);
                    for (method, raw_path, route) in self.decorator_routes(&callee, &args, src) {
                        handlers.push(HttpRouteHandler {
                            file: path.to_path_buf(),
                            line: line_of(decorator),
                            function: name.clone(),
                            method: method.to_string(),
                            raw_path,
                            path: route,
                            detected_by: RouteSource::Decorator,
                        });
                    }
                }
            }
        }

        // File-path conventions: exported verb-named functions.
        if let Some((convention, route)) = self
            .conventions
            .iter()
            .find_map(|c| c.route_path(path).map(|route| (c.name(), route)))
        {
            debug!("{} serves {} ({})", path.display(), route, convention);
            for def in functions.iter().filter(|f| f.is_exported && HTTP_VERBS.contains(&f.name.as_str())) {
                handlers.push(HttpRouteHandler {
                    file: path.to_path_buf(),
                    line: def.start_line,
                    function: def.name.clone(),
                    method: def.name.clone(),
                    raw_path: route.clone(),
                    path: normalize_path(&route).unwrap_or_else(|| route.clone()),
                    detected_by: RouteSource::FileConvention,
                });
            }
        }

        // LLM client variables.
        let might_contain_llm = self.matcher.might_contain_llm(code);
        let llm_variables = if self.track_bindings && might_contain_llm {
            self.llm_bindings(queries, root, src)
        } else {
            Vec::new()
        };

        // Attribute calls to their innermost enclosing function.
        let mut http_calls = Vec::new();
        let mut llm_sites = Vec::new();
        for call in &calls {
            if registrations.contains(&call.node.id()) {
                continue;
            }
            let line = line_of(call.node);
            let owner = innermost(&spans, call.node.start_byte());
            let owner_name = owner.map_or(MODULE_SCOPE.to_string(), |i| functions[i].name.clone());
            let is_llm = self.matcher.is_llm_call(&call.callee) || through_variable(&call.callee, &llm_variables);

            if is_llm {
                llm_sites.push(LlmCallSite {
                    function: owner_name.clone(),
                    callee: call.callee.clone(),
                    line,
                });
            }

            let args = call_arguments(call.node);
            let request = self.client_request(&call.callee, &args, src).and_then(|(method, raw_path)| {
                let path_value = normalize_path(&raw_path)?;
                Some(HttpClientCall {
                    file: path.to_path_buf(),
                    line,
                    function: owner_name.clone(),
                    method: method.to_string(),
                    raw_path,
                    path: path_value,
                })
            });

            if let Some(index) = owner {
                let def = &mut functions[index];
                if is_llm && !def.llm_calls.contains(&call.callee) {
                    def.llm_calls.push(call.callee.clone());
                }
                if !is_builtin(rules.builtins(), &call.callee) {
                    if !def.calls.contains(&call.callee) {
                        def.calls.push(call.callee.clone());
                    }
                    def.call_sites.push(CallSite {
                        callee: call.callee.clone(),
                        line,
                    });
                }
                if let Some(request) = &request {
                    def.http_calls.push(request.clone());
                }
            }
            if let Some(request) = request {
                http_calls.push(request);
            }
        }

        for def in &mut functions {
            def.has_llm_call = def.has_direct_llm_call();
        }

        debug!(
            "{}: {} functions, {} imports, {} routes, {} requests",
            path.display(),
            functions.len(),
            imports.len(),
            handlers.len(),
            http_calls.len()
        );

        Scan {
            structure: FileStructure {
                file: path.to_path_buf(),
                language: Some(language),
                functions,
                imports,
                exports: exports.into_iter().collect(),
                route_handlers: handlers,
                http_calls,
            },
            llm_variables,
            llm_sites,
            might_contain_llm,
        }
    }

    /// `app.post("/chat", handler)` on a known router object.
    fn router_route<'t>(&self, callee: &str, args: &[Node<'t>], src: &[u8]) -> Option<Route<'t>> {
        let object = receiver(callee)?;
        if !self.http.is_router(object) {
            return None;
        }
        let method = http_verb(simple_name(callee))?;
        let (position, raw_path) = first_string(args, src)?;
        let path = normalize_path(&raw_path)?;

        // `api.post("/x", payload)` on an object that is also a client is a request.
        let references_allowed = !self.http.is_client(object);
        let handler = args[position + 1..]
            .iter()
            .rev()
            .find(|arg| is_function_literal(**arg) || (references_allowed && is_function_reference(**arg)))?;
        let handler = if is_function_literal(*handler) {
            Handler::Inline(*handler)
        } else {
            Handler::Named(simple_name(&normalize_callee(text(*handler, src))).to_string())
        };

        Some(Route {
            method,
            raw_path,
            path,
            handler,
        })
    }

    /// `@app.get("/x")`, `@router.post("/x")`, `@app.route("/x", methods=["POST"])`.
    fn decorator_routes(&self, callee: &str, args: &[Node<'_>], src: &[u8]) -> Vec<(&'static str, String, String)> {
        let Some(object) = receiver(callee) else {
            return Vec::new();
        };
        if !self.http.is_router(object) {
            return Vec::new();
        }
        let Some((_, raw_path)) = first_string(args, src) else {
            return Vec::new();
        };
        let Some(path) = normalize_path(&raw_path) else {
            return Vec::new();
        };

        let name = simple_name(callee);
        let methods: Vec<&'static str> = if matches!(name, "route" | "api_route") {
            let listed = keyword_strings(args, "methods", src)
                .iter()
                .filter_map(|m| http_verb(m))
                .collect::<Vec<_>>();
            if listed.is_empty() { vec!["GET"] } else { listed }
        } else {
            http_verb(name).into_iter().collect()
        };

        methods
            .into_iter()
            .map(|method| (method, raw_path.clone(), path.clone()))
            .collect()
    }

    /// `fetch(url, { method })` or a verb method on a known client object.
    fn client_request(&self, callee: &str, args: &[Node<'_>], src: &[u8]) -> Option<(&'static str, String)> {
        let name = simple_name(callee);
        if name == "fetch" && receiver(callee).is_none_or(|r| matches!(r, "window" | "globalThis" | "self")) {
            let (position, raw_path) = first_string(args, src)?;
            let method = args
                .get(position + 1)
                .and_then(|options| fetch_method(*options, src))
                .unwrap_or("GET");
            return Some((method, raw_path));
        }

        let object = receiver(callee)?;
        if !self.http.is_client(object) {
            return None;
        }
        let method = http_verb(name)?;
        let (_, raw_path) = first_string(args, src)?;
        Some((method, raw_path))
    }

    /// Variables bound (transitively) to LLM clients, sorted.
    fn llm_bindings(&self, queries: &CompiledQueries, root: Node<'_>, src: &[u8]) -> Vec<String> {
        let Some(query) = &queries.bindings else {
            return Vec::new();
        };

        let bindings: Vec<(String, String, bool)> = run(query, root, src)
            .iter()
            .filter_map(|captures| {
                let name = normalize_callee(text(capture(query, captures, "name")?, src));
                let value = unwrap_value(capture(query, captures, "value")?);
                let value_text = normalize_callee(text(value, src));
                let is_call = value_text.contains('(');
                let head = value_text.split('(').next().unwrap_or("").to_string();
                Some((name, head, is_call))
            })
            .collect();

        let mut variables: HashSet<String> = HashSet::new();
        loop {
            let before = variables.len();
            for (name, head, is_call) in &bindings {
                if variables.contains(name) || head.is_empty() {
                    continue;
                }
                let constructed = *is_call && self.matcher.is_llm_identifier(head);
                let derived = variables.iter().any(|v| head == v || starts_with_member(head, v));
                if constructed || derived {
                    variables.insert(name.clone());
                }
            }
            if variables.len() == before {
                break;
            }
        }

        let mut sorted: Vec<String> = variables.into_iter().collect();
        sorted.sort();
        sorted
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::with_matcher(Arc::new(PatternSet::default()), &AnalysisConfig::default())
    }
}

fn compile_language(language: Language) -> LanguageEntry {
    let rules = languages::rules_for(language);
    let grammar = parser::grammar(language);
    let sources = rules.queries();
    let compile = |kind: &'static str, source: Option<&str>| -> Option<Query> {
        let source = source?;
        match Query::new(&grammar, source) {
            Ok(query) => Some(query),
            Err(e) => {
                let error = IndexError::Query {
                    language,
                    kind,
                    message: e.to_string(),
                };
                warn!("{}", error);
                None
            }
        }
    };

    let queries = CompiledQueries {
        functions: compile("functions", Some(sources.functions)),
        calls: compile("calls", Some(sources.calls)),
        imports: compile("imports", sources.imports),
        exports: compile("exports", sources.exports),
        extras: compile("extras", sources.extras),
        bindings: compile("bindings", sources.bindings),
    };
    LanguageEntry { rules, queries }
}

/// Byte range of a function node, pointing at its definition.
struct Span {
    start: usize,
    end: usize,
    index: usize,
}

impl Span {
    fn of(node: Node<'_>, index: usize) -> Self {
        Span {
            start: node.start_byte(),
            end: node.end_byte(),
            index,
        }
    }
}

fn innermost(spans: &[Span], byte: usize) -> Option<usize> {
    spans
        .iter()
        .filter(|s| s.start <= byte && byte < s.end)
        .min_by_key(|s| s.end - s.start)
        .map(|s| s.index)
}

struct CallNode<'t> {
    node: Node<'t>,
    callee: String,
}

enum Handler<'t> {
    Named(String),
    Inline(Node<'t>),
}

struct Route<'t> {
    method: &'static str,
    raw_path: String,
    path: String,
    handler: Handler<'t>,
}

type Captures<'t> = Vec<(u32, Node<'t>)>;

/// All matches of `query` under `root`, as capture index/node pairs.
fn run<'t>(query: &Query, root: Node<'t>, src: &[u8]) -> Vec<Captures<'t>> {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, src);
    let mut out = Vec::new();
    while let Some(m) = matches.next() {
        out.push(m.captures.iter().map(|c| (c.index, c.node)).collect());
    }
    out
}

fn capture<'t>(query: &Query, captures: &[(u32, Node<'t>)], name: &str) -> Option<Node<'t>> {
    let index = query.capture_index_for_name(name)?;
    captures.iter().find(|(i, _)| *i == index).map(|(_, node)| *node)
}

fn end_line(node: Node<'_>) -> u32 {
    node.end_position().row as u32 + 1
}

fn first_string(args: &[Node<'_>], src: &[u8]) -> Option<(usize, String)> {
    args.iter()
        .enumerate()
        .find_map(|(i, arg)| string_value(*arg, src).map(|s| (i, s)))
}

/// String items of a keyword argument list: `methods=["GET", "POST"]`.
fn keyword_strings(args: &[Node<'_>], keyword: &str, src: &[u8]) -> Vec<String> {
    args.iter()
        .filter(|arg| arg.kind() == "keyword_argument")
        .filter(|arg| arg.child_by_field_name("name").is_some_and(|n| text(n, src) == keyword))
        .filter_map(|arg| arg.child_by_field_name("value"))
        .flat_map(|value| named_children(value).into_iter().filter_map(|item| string_value(item, src)))
        .collect()
}

/// `{ method: 'POST' }` in a fetch options object.
fn fetch_method(options: Node<'_>, src: &[u8]) -> Option<&'static str> {
    named_children(options)
        .into_iter()
        .filter(|pair| pair.kind() == "pair")
        .find(|pair| {
            pair.child_by_field_name("key")
                .is_some_and(|key| languages::strip_quotes(text(key, src)) == "method")
        })
        .and_then(|pair| pair.child_by_field_name("value"))
        .and_then(|value| string_value(value, src))
        .and_then(|method| http_verb(&method))
}

/// Look through `await`, `new` and parentheses to the expression producing a value.
fn unwrap_value(mut node: Node<'_>) -> Node<'_> {
    while matches!(
        node.kind(),
        "await" | "await_expression" | "new_expression" | "parenthesized_expression" | "expression_list"
    ) {
        match node.named_child(0) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

fn starts_with_member(text: &str, variable: &str) -> bool {
    text.strip_prefix(variable)
        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with("::") || rest.starts_with("->"))
}

fn through_variable(callee: &str, variables: &[String]) -> bool {
    variables.iter().any(|v| starts_with_member(callee, v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(path: &str, code: &str) -> FileStructure {
        let extractor = Extractor::default();
        let mut parsers = ParserManager::new();
        extractor.extract_file_structure(&mut parsers, code, Path::new(path))
    }

    #[test]
    fn test_python_functions_calls_and_llm() {
        let code = r#"
import openai
from utils.text import clean as tidy, split_words

async def generate(prompt, model="gpt-4"):
    text = tidy(prompt)
    print(text)
    return await client.chat.completions.create(model=model, messages=[text])

def _private():
    generate("x")
    generate("y")
"#;
        let file = structure("llm.py", code);
        let generate = file.function("generate").unwrap();
        assert!(generate.is_async);
        assert!(generate.is_exported);
        assert_eq!(generate.params.len(), 2);
        assert_eq!(generate.calls, vec!["tidy", "client.chat.completions.create"]);
        assert_eq!(generate.llm_calls, vec!["client.chat.completions.create"]);
        assert!(generate.has_llm_call);
        assert_eq!(generate.start_line, 5);

        let private = file.function("_private").unwrap();
        assert!(!private.is_exported);
        assert_eq!(private.calls, vec!["generate"]);
        assert_eq!(private.call_sites.len(), 2);
        assert!(!private.has_llm_call);

        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[0].alias.as_deref(), Some("openai"));
        assert_eq!(file.imports[1].source, "utils.text");
        assert_eq!(file.imports[1].names[0].local_name(), "tidy");
        assert_eq!(file.imports[1].names[1].name, "split_words");
    }

    #[test]
    fn test_python_all_overrides_underscore_rule() {
        let code = "__all__ = ['_hidden']\n\ndef _hidden():\n    pass\n\ndef public():\n    pass\n";
        let file = structure("mod.py", code);
        assert!(file.function("_hidden").unwrap().is_exported);
        assert!(!file.function("public").unwrap().is_exported);
        assert_eq!(file.exports, vec!["_hidden"]);
    }

    #[test]
    fn test_python_decorator_routes() {
        let code = r#"
from fastapi import FastAPI
app = FastAPI()

@app.post("/api/chat/")
async def chat(body):
    return generate(body)

@app.route("/items/<id>", methods=["GET", "DELETE"])
def item(id):
    pass

@cache
def helper():
    pass
"#;
        let file = structure("server.py", code);
        let routes: Vec<(&str, &str, &str)> = file
            .route_handlers
            .iter()
            .map(|h| (h.method.as_str(), h.path.as_str(), h.function.as_str()))
            .collect();
        assert_eq!(
            routes,
            vec![
                ("POST", "/api/chat", "chat"),
                ("GET", "/items/<id>", "item"),
                ("DELETE", "/items/<id>", "item"),
            ]
        );
        assert!(file.route_handlers.iter().all(|h| h.detected_by == RouteSource::Decorator));
    }

    #[test]
    fn test_javascript_exports_routes_and_requests() {
        let code = r#"
import axios from 'axios';
import { summarize as sum } from './llm';
const express = require('express');

export async function submit(text) {
  const res = await fetch('/api/chat', { method: 'POST', body: text });
  return axios.get(`/api/history/${id}`);
}

function local() {
  console.log('x');
}

const app = express();
app.post('/api/chat', async (req, res) => {
  const out = await sum(req.body);
  res.json(out);
});
app.get('/api/history/:id', getHistory);
"#;
        let file = structure("web/client.js", code);

        let submit = file.function("submit").unwrap();
        assert!(submit.is_exported && submit.is_async);
        assert!(!file.function("local").unwrap().is_exported);
        assert!(file.function("local").unwrap().calls.is_empty());

        let requests: Vec<(&str, &str)> = file.http_calls.iter().map(|c| (c.method.as_str(), c.path.as_str())).collect();
        assert_eq!(requests, vec![("POST", "/api/chat"), ("GET", "/api/history/:param")]);
        assert_eq!(submit.http_calls.len(), 2);

        let inline = file.function("POST /api/chat").unwrap();
        assert_eq!(inline.calls, vec!["sum"]);
        let routes: Vec<(&str, &str)> = file.route_handlers.iter().map(|h| (h.function.as_str(), h.path.as_str())).collect();
        assert_eq!(routes, vec![("POST /api/chat", "/api/chat"), ("getHistory", "/api/history/:id")]);

        assert_eq!(file.imports.len(), 3);
        assert_eq!(file.imports[0].alias.as_deref(), Some("axios"));
        assert_eq!(file.imports[1].names[0].local_name(), "sum");
        assert_eq!(file.imports[2].source, "express");
    }

    #[test]
    fn test_next_route_file_convention() {
        let code = "export async function POST(req) {\n  return Response.json(await run(req));\n}\nexport const GET = async () => null;\n";
        let file = structure("app/api/chat/route.ts", code);
        let mut methods: Vec<&str> = file.route_handlers.iter().map(|h| h.method.as_str()).collect();
        methods.sort();
        assert_eq!(methods, vec!["GET", "POST"]);
        assert!(file.route_handlers.iter().all(|h| h.path == "/api/chat"));
        assert!(file.route_handlers.iter().all(|h| h.detected_by == RouteSource::FileConvention));
    }

    struct HandlersDir;

    impl RouteConvention for HandlersDir {
        fn name(&self) -> &'static str {
            "handlers-dir"
        }

        fn route_path(&self, file: &Path) -> Option<String> {
            let rest = file.strip_prefix("handlers").ok()?;
            Some(format!("/{}", rest.file_stem()?.to_str()?))
        }
    }

    #[test]
    fn test_injected_route_convention() {
        let extractor = Extractor::default().with_conventions(vec![Box::new(HandlersDir)]);
        let mut parsers = ParserManager::new();
        let code = "export function GET() {\n  return 1;\n}\n";

        let file = extractor.extract_file_structure(&mut parsers, code, Path::new("handlers/ping.ts"));
        assert_eq!(file.route_handlers.len(), 1);
        assert_eq!(file.route_handlers[0].path, "/ping");
        assert_eq!(file.route_handlers[0].method, "GET");

        // Replaces the defaults rather than adding to them.
        let next = extractor.extract_file_structure(&mut parsers, code, Path::new("app/api/ping/route.ts"));
        assert!(next.route_handlers.is_empty());
    }

    #[test]
    fn test_go_rust_and_c() {
        let go = structure(
            "svc/llm.go",
            "package svc\n\nimport (\n\tai \"github.com/acme/ai\"\n\t\"fmt\"\n)\n\nfunc Generate() {\n\tfmt.Println(\"x\")\n\tai.Ask()\n}\n\nfunc helper() {}\n",
        );
        assert!(go.function("Generate").unwrap().is_exported);
        assert!(!go.function("helper").unwrap().is_exported);
        assert_eq!(go.function("Generate").unwrap().calls, vec!["ai.Ask"]);
        assert_eq!(go.imports[0].alias.as_deref(), Some("ai"));
        assert_eq!(go.imports[1].alias.as_deref(), Some("fmt"));

        let rust = structure(
            "src/agent.rs",
            "use crate::llm::{ask, Client as C};\n\npub async fn run() {\n    println!(\"hi\");\n    ask();\n    tracing::info!(\"done\");\n}\n\nfn inner() {}\n",
        );
        let run = rust.function("run").unwrap();
        assert!(run.is_exported && run.is_async);
        assert_eq!(run.calls, vec!["ask"]);
        assert!(!rust.function("inner").unwrap().is_exported);
        assert_eq!(rust.imports.len(), 2);
        assert_eq!(rust.imports[0].source, "crate::llm");
        assert_eq!(rust.imports[1].names[0].local_name(), "C");

        let c = structure(
            "src/main.c",
            "#include <stdio.h>\n#include \"llm.h\"\n\nstatic char *ask(const char *q) {\n    printf(\"%s\", q);\n    return complete(q);\n}\n",
        );
        let ask = c.function("ask").unwrap();
        assert_eq!(ask.calls, vec!["complete"]);
        assert_eq!(ask.params, vec!["const char *q"]);
        assert_eq!(c.imports.len(), 1);
        assert_eq!(c.imports[0].source, "llm.h");
    }

    #[test]
    fn test_binding_tracking() {
        let code = r#"
from langchain_openai import ChatOpenAI

llm = ChatOpenAI(model="gpt-4o")
chain = llm

def answer(q):
    return chain.invoke(q)

def other(q):
    return q.strip()
"#;
        let extractor = Extractor::default();
        let mut parsers = ParserManager::new();
        let analysis = extractor.extract_file_analysis(&mut parsers, code, Path::new("chain.py"));
        assert!(analysis.might_contain_llm);
        assert_eq!(analysis.llm_variables, vec!["chain", "llm"]);
        assert_eq!(analysis.llm_calls.len(), 1);
        assert_eq!(analysis.llm_calls[0].function, "answer");
        assert_eq!(analysis.llm_calls[0].callee, "chain.invoke");

        let file = extractor.extract_file_structure(&mut parsers, code, Path::new("chain.py"));
        assert!(file.function("answer").unwrap().has_llm_call);
        assert!(!file.function("other").unwrap().has_llm_call);
    }

    #[test]
    fn test_unsupported_and_empty_input() {
        let file = structure("README.md", "# hello");
        assert!(file.is_empty());
        assert_eq!(file.language, None);

        let file = structure("empty.py", "");
        assert!(file.is_empty());

        let extractor = Extractor::default();
        let mut parsers = ParserManager::new();
        let analysis = extractor.extract_file_analysis(&mut parsers, "", Path::new("x.ts"));
        assert!(analysis.llm_calls.is_empty());
    }

    #[test]
    fn test_every_language_compiles_core_queries() {
        let extractor = Extractor::default();
        for language in Language::ALL {
            assert!(extractor.supports(language), "{} queries failed to compile", language);
        }
    }
}
