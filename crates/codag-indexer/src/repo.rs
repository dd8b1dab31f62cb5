//! Repo-wide aggregation of per-file structure
//!
//! Runs the per-file extractor over every source file, then links the results:
//! HTTP clients are paired with route handlers, LLM-relatedness flows from
//! direct LLM callers to everything that transitively calls them, and calls
//! through imports are resolved to the file that defines the callee.

use crate::extractor::{Extractor, FileStructure, MODULE_SCOPE};
use crate::http::match_paths;
use crate::parser::ParserManager;
use crate::resolve::{ModuleResolver, normalize};
use codag_core::{
    CalleeRef, CallerRef, CrossFileCall, FunctionRef, HttpClientCall, HttpConnection, HttpRouteHandler, Language,
    SymbolTable, receiver, simple_name,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A file handed to the repo scan: repository-relative path plus content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        SourceFile {
            path: path.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoStructure {
    pub files: Vec<FileStructure>,
    pub http_client_calls: Vec<HttpClientCall>,
    pub http_route_handlers: Vec<HttpRouteHandler>,
    pub http_connections: Vec<HttpConnection>,
    pub cross_file_calls: Vec<CrossFileCall>,
}

impl RepoStructure {
    pub fn file(&self, path: &Path) -> Option<&FileStructure> {
        let path = normalize(path);
        self.files.iter().find(|f| f.file == path)
    }

    pub fn function(&self, path: &Path, name: &str) -> Option<&codag_core::FunctionDef> {
        self.file(path)?.function(name)
    }
}

impl Extractor {
    /// Extract and link every file. Files with unmapped extensions are skipped;
    /// files that fail to parse contribute an empty structure.
    pub fn extract_repo_structure(&self, parsers: &mut ParserManager, files: &[SourceFile]) -> RepoStructure {
        let mut structures: Vec<FileStructure> = files
            .iter()
            .filter(|f| Language::from_path(&f.path).is_some())
            .map(|f| {
                let path = normalize(&f.path);
                let mut structure = self.extract_file_structure(parsers, &f.content, &path);
                structure.language = structure.language.or_else(|| Language::from_path(&path));
                structure
            })
            .collect();

        let symbols = SymbolTable::new();
        for structure in &structures {
            for function in &structure.functions {
                symbols.insert(&structure.file, &function.name);
            }
        }

        let http_client_calls: Vec<HttpClientCall> =
            structures.iter().flat_map(|s| s.http_calls.iter().cloned()).collect();
        let http_route_handlers: Vec<HttpRouteHandler> =
            structures.iter().flat_map(|s| s.route_handlers.iter().cloned()).collect();
        let http_connections = match_http(&http_client_calls, &http_route_handlers);

        let flagged = propagate_llm_calls(&mut structures, &symbols, &http_connections);

        let resolver = ModuleResolver::new(structures.iter().map(|s| s.file.as_path()));
        let cross_file_calls = resolve_cross_file_calls(&structures, &resolver);

        info!(
            "Repo structure: {} files, {} LLM-related functions, {} HTTP connections, {} cross-file calls",
            structures.len(),
            flagged,
            http_connections.len(),
            cross_file_calls.len()
        );

        RepoStructure {
            files: structures,
            http_client_calls,
            http_route_handlers,
            http_connections,
            cross_file_calls,
        }
    }
}

/// Every client × handler pair whose method and path match.
pub fn match_http(clients: &[HttpClientCall], handlers: &[HttpRouteHandler]) -> Vec<HttpConnection> {
    let mut connections = Vec::new();
    for client in clients {
        for handler in handlers {
            if let Some(confidence) = match_paths(&handler.path, &client.path, &handler.method, &client.method) {
                connections.push(HttpConnection {
                    client: client.clone(),
                    handler: handler.clone(),
                    confidence,
                });
            }
        }
    }
    connections
}

/// Mark every transitive caller of a direct LLM caller `has_llm_call`.
///
/// Callees resolve by bare name against every same-named function in the
/// repo; a matched HTTP connection makes the client function a caller of the
/// handler. Returns how many functions end up flagged.
pub fn propagate_llm_calls(
    files: &mut [FileStructure],
    symbols: &SymbolTable,
    connections: &[HttpConnection],
) -> usize {
    let mut callers: HashMap<FunctionRef, Vec<FunctionRef>> = HashMap::new();
    for structure in files.iter() {
        for function in &structure.functions {
            let caller = FunctionRef::new(&structure.file, &function.name);
            for callee in &function.calls {
                for target in symbols.lookup(simple_name(callee)) {
                    callers.entry(target).or_default().push(caller.clone());
                }
            }
        }
    }
    for connection in connections {
        if connection.client.function == MODULE_SCOPE {
            continue;
        }
        let handler = FunctionRef::new(&connection.handler.file, &connection.handler.function);
        let client = FunctionRef::new(&connection.client.file, &connection.client.function);
        callers.entry(handler).or_default().push(client);
    }

    let mut flagged: HashSet<FunctionRef> = HashSet::new();
    let mut queue: VecDeque<FunctionRef> = VecDeque::new();
    for structure in files.iter() {
        for function in structure.functions.iter().filter(|f| f.has_direct_llm_call()) {
            let id = FunctionRef::new(&structure.file, &function.name);
            if flagged.insert(id.clone()) {
                queue.push_back(id);
            }
        }
    }
    while let Some(current) = queue.pop_front() {
        for caller in callers.get(&current).into_iter().flatten() {
            if flagged.insert(caller.clone()) {
                queue.push_back(caller.clone());
            }
        }
    }

    for structure in files.iter_mut() {
        for function in &mut structure.functions {
            let id = FunctionRef::new(&structure.file, &function.name);
            function.has_llm_call = flagged.contains(&id);
        }
    }
    debug!("LLM propagation flagged {} functions", flagged.len());
    flagged.len()
}

/// Imports of one file, resolved to repository files.
#[derive(Default)]
struct ImportScope {
    /// Local module alias → (files, import source).
    modules: HashMap<String, (Vec<PathBuf>, String)>,
    /// Local name → (files, name in the source module, import source).
    names: HashMap<String, (Vec<PathBuf>, String, String)>,
    /// Wildcard imports: (files, import source).
    wildcards: Vec<(Vec<PathBuf>, String)>,
}

impl ImportScope {
    fn build(structure: &FileStructure, resolver: &ModuleResolver) -> Self {
        let mut scope = ImportScope::default();
        for import in &structure.imports {
            let targets = resolver.resolve(&structure.file, &import.source);
            if let Some(alias) = &import.alias {
                if !targets.is_empty() {
                    scope.modules.insert(alias.clone(), (targets.clone(), import.source.clone()));
                }
            }
            for name in &import.names {
                if name.name == "*" {
                    if !targets.is_empty() {
                        scope.wildcards.push((targets.clone(), import.source.clone()));
                    }
                    continue;
                }
                let local = name.local_name().to_string();
                if !targets.is_empty() {
                    scope
                        .names
                        .insert(local.clone(), (targets.clone(), name.name.clone(), import.source.clone()));
                }
                // `from pkg import module`, `use crate::llm;`
                let nested = submodule(&import.source, &name.name);
                let module_targets = resolver.resolve(&structure.file, &nested);
                if !module_targets.is_empty() {
                    scope.modules.entry(local).or_insert((module_targets, nested));
                }
            }
        }
        scope
    }

    /// Target files and callee name for one call expression.
    fn lookup(&self, callee: &str) -> Vec<(&[PathBuf], String, &str)> {
        let name = simple_name(callee);
        match receiver(callee) {
            Some(object) => self
                .modules
                .get(object)
                .map(|(files, source)| (files.as_slice(), name.to_string(), source.as_str()))
                .into_iter()
                .collect(),
            None => {
                if let Some((files, original, source)) = self.names.get(callee) {
                    return vec![(files.as_slice(), original.clone(), source.as_str())];
                }
                self.wildcards
                    .iter()
                    .map(|(files, source)| (files.as_slice(), name.to_string(), source.as_str()))
                    .collect()
            }
        }
    }
}

/// Module path of `name` inside `source`, in the source's own notation.
fn submodule(source: &str, name: &str) -> String {
    if source.is_empty() {
        name.to_string()
    } else if source.contains("::") || matches!(source, "crate" | "super" | "self") {
        format!("{}::{}", source, name)
    } else if source.contains('/') {
        format!("{}/{}", source, name)
    } else if source.ends_with('.') {
        format!("{}{}", source, name)
    } else {
        format!("{}.{}", source, name)
    }
}

/// Resolve calls made through imports to the file that defines the callee.
/// The first target file that defines or exports the name wins.
pub fn resolve_cross_file_calls(files: &[FileStructure], resolver: &ModuleResolver) -> Vec<CrossFileCall> {
    let by_file: HashMap<&Path, &FileStructure> = files.iter().map(|s| (s.file.as_path(), s)).collect();
    let provides = |file: &Path, name: &str| {
        by_file
            .get(file)
            .is_some_and(|s| s.function(name).is_some() || s.exports.iter().any(|e| e == name))
    };

    let mut calls = Vec::new();
    for structure in files {
        if structure.imports.is_empty() {
            continue;
        }
        let scope = ImportScope::build(structure, resolver);
        for function in &structure.functions {
            for callee in &function.calls {
                let resolved = scope.lookup(callee).into_iter().find_map(|(targets, name, source)| {
                    targets
                        .iter()
                        .find(|target| **target != structure.file && provides(target.as_path(), &name))
                        .map(|target| (target.clone(), name, source.to_string()))
                });
                let Some((target, name, source)) = resolved else {
                    continue;
                };
                calls.push(CrossFileCall {
                    caller: CallerRef {
                        file: structure.file.clone(),
                        function: function.name.clone(),
                        line: function.call_line(callee),
                    },
                    callee: CalleeRef {
                        file: target,
                        function: name,
                        module: Some(source),
                    },
                });
            }
        }
    }
    calls
}
