//! Static workflow graph built from repo structure
//!
//! One node per LLM-related function, call edges between them and labelled
//! edges across matched HTTP connections. The result feeds
//! [`codag_core::WorkflowDetector`].

use crate::extractor::MODULE_SCOPE;
use crate::repo::RepoStructure;
use crate::resolve::to_slash;
use codag_core::{NodeKind, SourceLocation, WorkflowEdge, WorkflowHint, WorkflowNode, simple_name};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// `<file>::<function>` with a forward-slash file path.
pub fn node_id(file: &Path, function: &str) -> String {
    format!("{}::{}", to_slash(file), function)
}

pub fn build_workflow_graph(repo: &RepoStructure) -> (Vec<WorkflowNode>, Vec<WorkflowEdge>) {
    // Related functions, in repo order.
    let mut related: Vec<(String, &codag_core::FunctionDef)> = Vec::new();
    let mut by_name: HashMap<&str, Vec<String>> = HashMap::new();
    for structure in &repo.files {
        for function in structure.functions.iter().filter(|f| f.has_llm_call) {
            let id = node_id(&structure.file, &function.name);
            by_name.entry(function.name.as_str()).or_default().push(id.clone());
            related.push((id, function));
        }
    }
    let related_ids: HashSet<&str> = related.iter().map(|(id, _)| id.as_str()).collect();

    // (caller id, callee name) → resolved callee id
    let cross_file: HashMap<(String, &str), String> = repo
        .cross_file_calls
        .iter()
        .map(|call| {
            (
                (node_id(&call.caller.file, &call.caller.function), call.callee.function.as_str()),
                node_id(&call.callee.file, &call.callee.function),
            )
        })
        .collect();

    let mut edges: Vec<WorkflowEdge> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut push = |edge: WorkflowEdge, edges: &mut Vec<WorkflowEdge>| {
        if edge.source != edge.target && seen.insert(edge.key()) {
            edges.push(edge);
        }
    };

    for (id, function) in &related {
        for callee in &function.calls {
            let name = simple_name(callee);
            let same_file = node_id(&function.file, name);
            let targets: Vec<String> = if related_ids.contains(same_file.as_str()) {
                vec![same_file]
            } else if let Some(target) = cross_file.get(&(id.clone(), name)) {
                vec![target.clone()]
            } else {
                by_name.get(name).cloned().unwrap_or_default()
            };
            for target in targets.into_iter().filter(|t| related_ids.contains(t.as_str())) {
                push(WorkflowEdge::new(id.clone(), target), &mut edges);
            }
        }
    }

    for connection in &repo.http_connections {
        if connection.client.function == MODULE_SCOPE {
            continue;
        }
        let source = node_id(&connection.client.file, &connection.client.function);
        let target = node_id(&connection.handler.file, &connection.handler.function);
        if related_ids.contains(source.as_str()) && related_ids.contains(target.as_str()) {
            let label = format!("{} {}", connection.handler.method, connection.handler.path);
            push(WorkflowEdge::new(source, target).labeled(label), &mut edges);
        }
    }

    let handlers: HashMap<String, String> = repo
        .http_route_handlers
        .iter()
        .map(|h| (node_id(&h.file, &h.function), format!("{} {}", h.method, h.path)))
        .collect();
    let with_callers: HashSet<&str> = edges.iter().map(|e| e.target.as_str()).collect();
    let with_callees: HashSet<&str> = edges.iter().map(|e| e.source.as_str()).collect();

    let nodes: Vec<WorkflowNode> = related
        .iter()
        .map(|(id, function)| {
            let route = handlers.get(id);
            let kind = if function.has_direct_llm_call() {
                NodeKind::llm()
            } else if route.is_some() || !with_callers.contains(id.as_str()) {
                NodeKind::Trigger
            } else {
                NodeKind::Tool
            };
            let mut node = WorkflowNode::new(id.clone(), function.name.clone(), kind).with_source(SourceLocation {
                file: to_slash(&function.file),
                line: function.start_line,
                function: function.name.clone(),
            });
            node.description = route.cloned();
            node.is_entry_point = node.kind == NodeKind::Trigger;
            node.is_exit_point = !with_callees.contains(id.as_str());
            node
        })
        .collect();

    debug!("Static workflow graph: {} nodes, {} edges", nodes.len(), edges.len());
    (nodes, edges)
}

/// Point hint node ids at analysed nodes when the hint names a file path the
/// scan did not see: same function, file matched by path suffix, then by file
/// name. Returns how many ids were rewritten.
pub fn repair_hints(hints: &mut [WorkflowHint], known: &HashSet<String>) -> usize {
    let sorted: BTreeSet<&String> = known.iter().collect();
    let mut repaired = 0;
    for hint in hints.iter_mut() {
        for id in hint.node_ids.iter_mut() {
            if known.contains(id.as_str()) {
                continue;
            }
            let Some((file, function)) = id.split_once("::") else {
                continue;
            };
            let candidates: Vec<(&str, &str)> = sorted
                .iter()
                .filter_map(|k| k.split_once("::"))
                .filter(|(_, f)| *f == function)
                .collect();
            let by_suffix = candidates.iter().find(|(k, _)| {
                k.ends_with(&format!("/{}", file)) || file.ends_with(&format!("/{}", k))
            });
            let file_name = file.rsplit('/').next().unwrap_or(file);
            let by_name = || {
                candidates
                    .iter()
                    .find(|(k, _)| k.rsplit('/').next().unwrap_or(*k) == file_name)
            };
            if let Some((k, f)) = by_suffix.or_else(by_name) {
                *id = format!("{}::{}", k, f);
                repaired += 1;
            }
        }
    }
    if repaired > 0 {
        debug!("Repaired {} hint node ids", repaired);
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Extractor;
    use crate::parser::ParserManager;
    use crate::repo::SourceFile;

    fn graph(files: &[(&str, &str)]) -> (Vec<WorkflowNode>, Vec<WorkflowEdge>) {
        let extractor = Extractor::default();
        let mut parsers = ParserManager::new();
        let sources: Vec<SourceFile> = files.iter().map(|(p, c)| SourceFile::new(*p, *c)).collect();
        build_workflow_graph(&extractor.extract_repo_structure(&mut parsers, &sources))
    }

    fn node<'a>(nodes: &'a [WorkflowNode], id: &str) -> &'a WorkflowNode {
        nodes.iter().find(|n| n.id == id).unwrap()
    }

    #[test]
    fn test_kinds_and_edges() {
        let (nodes, edges) = graph(&[
            (
                "agent/llm.py",
                "def generate(p):\n    return client.chat.completions.create(messages=p)\n\ndef summarize(t):\n    return generate(t)\n\ndef unrelated():\n    pass\n",
            ),
            ("agent/run.py", "from agent.llm import summarize\n\ndef main():\n    summarize('x')\n"),
        ]);
        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["agent/llm.py::generate", "agent/llm.py::summarize", "agent/run.py::main"]);

        assert!(node(&nodes, "agent/llm.py::generate").kind.is_llm());
        assert!(node(&nodes, "agent/llm.py::generate").is_exit_point);
        assert_eq!(node(&nodes, "agent/llm.py::summarize").kind, NodeKind::Tool);
        let main = node(&nodes, "agent/run.py::main");
        assert_eq!(main.kind, NodeKind::Trigger);
        assert!(main.is_entry_point);
        assert_eq!(main.source.as_ref().unwrap().line, 3);

        let keys: Vec<String> = edges.iter().map(|e| e.key()).collect();
        assert_eq!(
            keys,
            vec![
                "agent/llm.py::summarize->agent/llm.py::generate",
                "agent/run.py::main->agent/llm.py::summarize",
            ]
        );
    }

    #[test]
    fn test_http_edge_and_handler_trigger() {
        let (nodes, edges) = graph(&[
            (
                "api/server.py",
                "@app.post('/api/chat')\ndef chat():\n    return model.generate_content('hi')\n\n@router.get('/api/ping')\ndef ping():\n    return helper()\n\ndef helper():\n    return chat()\n",
            ),
            ("web/send.ts", "export async function send() {\n  return fetch('/api/chat', { method: 'POST' });\n}\n"),
        ]);
        let http: Vec<&WorkflowEdge> = edges.iter().filter(|e| e.label.is_some()).collect();
        assert_eq!(http.len(), 1);
        assert_eq!(http[0].source, "web/send.ts::send");
        assert_eq!(http[0].target, "api/server.py::chat");
        assert_eq!(http[0].label.as_deref(), Some("POST /api/chat"));

        let ping = node(&nodes, "api/server.py::ping");
        assert_eq!(ping.kind, NodeKind::Trigger);
        assert_eq!(ping.description.as_deref(), Some("GET /api/ping"));
        assert_eq!(node(&nodes, "api/server.py::helper").kind, NodeKind::Tool);
    }

    #[test]
    fn test_repair_hints() {
        let known: HashSet<String> = ["backend/src/llm.py::generate", "web/llm.ts::generate", "tools/run.py::main"]
            .map(String::from)
            .into_iter()
            .collect();
        let mut hints = vec![WorkflowHint {
            id: "w".to_string(),
            name: "W".to_string(),
            description: None,
            node_ids: vec![
                "src/llm.py::generate".to_string(),
                "scripts/run.py::main".to_string(),
                "web/llm.ts::generate".to_string(),
                "gone.py::nothing".to_string(),
            ],
        }];
        assert_eq!(repair_hints(&mut hints, &known), 2);
        assert_eq!(
            hints[0].node_ids,
            vec!["backend/src/llm.py::generate", "tools/run.py::main", "web/llm.ts::generate", "gone.py::nothing"]
        );
    }
}
