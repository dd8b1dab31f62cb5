//! Integration tests for Codag
//!
//! These tests drive the full pipeline through the library crates: extraction,
//! repo-wide linking, the static workflow graph, detection and diffing.

use codag_core::{
    GraphSnapshot, NodeKind, WorkflowDetector, WorkflowHint, WorkflowNode, compute_graph_diff, has_diff,
};
use codag_indexer::{
    Extractor, ParserManager, RepoStructure, SourceFile, build_workflow_graph, diff_call_graphs, repair_hints,
};
use std::collections::HashSet;

const LLM_PY: &str = r#"
from anthropic import Anthropic

client = Anthropic()

def ask_model(prompt):
    return client.messages.create(
        model="claude",
        messages=[{"role": "user", "content": prompt}],
    )
"#;

const PIPELINE_PY: &str = r#"
from server.llm import ask_model

def summarize(text):
    return ask_model(text)

def refine(text):
    return summarize(text)
"#;

const PIPELINE_EDITED_PY: &str = r#"
from server.llm import ask_model

def summarize(text):
    return ask_model(text)

def refine(text):
    return ask_model(text)
"#;

const API_PY: &str = r#"
from fastapi import FastAPI
from server.pipeline import refine

app = FastAPI()

@app.post("/api/summarize")
def summarize_endpoint(body):
    return refine(body)
"#;

const CLIENT_TS: &str = r#"
export async function submit(text: string) {
  const res = await fetch('/api/summarize', { method: 'POST', body: text });
  return res.json();
}

export function onClick() {
  return submit('x');
}
"#;

fn scan(pipeline: &str) -> RepoStructure {
    let extractor = Extractor::default();
    let mut parsers = ParserManager::new();
    let sources = vec![
        SourceFile::new("server/llm.py", LLM_PY),
        SourceFile::new("server/pipeline.py", pipeline),
        SourceFile::new("server/api.py", API_PY),
        SourceFile::new("web/client.ts", CLIENT_TS),
    ];
    let repo = extractor.extract_repo_structure(&mut parsers, &sources);
    parsers.dispose();
    assert!(parsers.stats().is_balanced());
    repo
}

fn snapshot(repo: &RepoStructure) -> GraphSnapshot {
    let (nodes, edges) = build_workflow_graph(repo);
    let detection = WorkflowDetector::new().detect(&nodes, &edges, None);
    GraphSnapshot::new(detection.nodes, detection.edges, detection.workflows)
}

fn node<'a>(snapshot: &'a GraphSnapshot, id: &str) -> &'a WorkflowNode {
    snapshot
        .nodes
        .iter()
        .find(|n| n.id == id)
        .unwrap_or_else(|| panic!("missing node {}", id))
}

#[test]
fn test_http_connection_links_client_to_handler() {
    let repo = scan(PIPELINE_PY);
    assert_eq!(repo.http_route_handlers.len(), 1);
    assert_eq!(repo.http_client_calls.len(), 1);
    assert_eq!(repo.http_connections.len(), 1);

    let connection = &repo.http_connections[0];
    assert_eq!(connection.client.function, "submit");
    assert_eq!(connection.handler.function, "summarize_endpoint");

    // The LLM flag reaches the browser code through the HTTP hop.
    for (file, function) in [
        ("server/llm.py", "ask_model"),
        ("server/pipeline.py", "summarize"),
        ("server/pipeline.py", "refine"),
        ("server/api.py", "summarize_endpoint"),
        ("web/client.ts", "submit"),
        ("web/client.ts", "onClick"),
    ] {
        let f = repo.function(std::path::Path::new(file), function).unwrap();
        assert!(f.has_llm_call, "{}::{}", file, function);
    }
}

#[test]
fn test_end_to_end_workflow_detection() {
    let snapshot = snapshot(&scan(PIPELINE_PY));
    assert_eq!(snapshot.nodes.len(), 6);

    assert!(node(&snapshot, "server/llm.py::ask_model").kind.is_llm());
    assert_eq!(node(&snapshot, "server/pipeline.py::refine").kind, NodeKind::Tool);
    assert_eq!(node(&snapshot, "server/api.py::summarize_endpoint").kind, NodeKind::Trigger);
    assert_eq!(
        node(&snapshot, "server/api.py::summarize_endpoint").description.as_deref(),
        Some("POST /api/summarize")
    );
    assert_eq!(node(&snapshot, "web/client.ts::onClick").kind, NodeKind::Trigger);

    let http: Vec<_> = snapshot.edges.iter().filter(|e| e.label.is_some()).collect();
    assert_eq!(http.len(), 1);
    assert_eq!(http[0].key(), "web/client.ts::submit->server/api.py::summarize_endpoint");

    assert_eq!(snapshot.workflows.len(), 1);
    assert_eq!(snapshot.workflows[0].name, "ask_model workflow");
    assert_eq!(snapshot.workflows[0].node_ids.len(), 6);

    let reloaded = GraphSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
    assert_eq!(reloaded, snapshot);
}

#[test]
fn test_edit_produces_graph_diff() {
    let before = snapshot(&scan(PIPELINE_PY));
    let after = snapshot(&scan(PIPELINE_EDITED_PY));

    let diff = compute_graph_diff(&before, &after);
    assert!(has_diff(&diff));
    assert_eq!(
        diff.edges.removed,
        vec!["server/pipeline.py::refine->server/pipeline.py::summarize"]
    );
    let added: Vec<String> = diff.edges.added.iter().map(|e| e.key()).collect();
    assert_eq!(added, vec!["server/pipeline.py::refine->server/llm.py::ask_model"]);

    // `summarize` lost its only caller.
    let updated: Vec<&str> = diff.nodes.updated.iter().map(|n| n.id.as_str()).collect();
    assert!(updated.contains(&"server/pipeline.py::summarize"));
    assert!(diff.nodes.added.is_empty());
    assert!(diff.nodes.removed.is_empty());

    assert!(!has_diff(&compute_graph_diff(&after, &after)));
}

#[test]
fn test_hints_drive_detection() {
    let repo = scan(PIPELINE_PY);
    let (nodes, edges) = build_workflow_graph(&repo);
    let known: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();

    let mut hints = vec![WorkflowHint {
        id: "summarize".to_string(),
        name: "Summarize".to_string(),
        description: Some("Summarize user text".to_string()),
        node_ids: vec!["llm.py::ask_model".to_string(), "api.py::summarize_endpoint".to_string()],
    }];
    assert_eq!(repair_hints(&mut hints, &known), 2);

    let detection = WorkflowDetector::new().detect(&nodes, &edges, Some(hints.as_slice()));
    assert_eq!(detection.workflows.len(), 1);
    let workflow = detection.workflow_of("server/llm.py::ask_model").unwrap();
    assert_eq!(workflow.name, "Summarize");
    assert!(workflow.node_ids.iter().any(|id| id == "server/api.py::summarize_endpoint"));
}

#[test]
fn test_call_graph_tracks_incremental_edits() {
    let extractor = Extractor::default();
    let mut parsers = ParserManager::new();
    let path = std::path::Path::new("server/pipeline.py");

    let before = extractor.extract_call_graph(&mut parsers, PIPELINE_PY, path);
    // Whole-file replacement: drop the cached tree instead of describing an edit.
    assert!(parsers.invalidate(path));
    let after = extractor.extract_call_graph(&mut parsers, PIPELINE_EDITED_PY, path);
    let diff = diff_call_graphs(&before, &after);
    assert_eq!(diff.modified_functions, vec!["refine"]);
    assert_eq!(diff.added_edges, vec!["refine->ask_model"]);
    assert_eq!(diff.removed_edges, vec!["refine->summarize"]);

    assert!(parsers.invalidate(path));
    assert!(parsers.stats().is_balanced());
}
