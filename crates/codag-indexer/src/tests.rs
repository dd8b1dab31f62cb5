//! Crate-level tests across extraction, linking and graph building

use crate::call_graph::diff_call_graphs;
use crate::config::AnalysisConfig;
use crate::extractor::Extractor;
use crate::parser::ParserManager;
use crate::patterns::LlmMatcher;
use crate::repo::SourceFile;
use crate::workflow_graph::build_workflow_graph;
use codag_core::{Language, RouteSource, WorkflowDetector};
use std::path::Path;
use std::sync::Arc;

const LLM_PY: &str = r#"
from openai import OpenAI

client = OpenAI()

def generate(prompt):
    response = client.chat.completions.create(
        model="gpt-4o",
        messages=[{"role": "user", "content": prompt}],
    )
    return response.choices[0].message.content
"#;

const TRIGGER_PY: &str = r#"
from llm import generate

def handle_webhook(payload):
    text = payload["text"]
    return generate(text)

def health():
    return "ok"
"#;

fn scan(files: &[(&str, &str)]) -> crate::repo::RepoStructure {
    let extractor = Extractor::default();
    let mut parsers = ParserManager::new();
    let sources: Vec<SourceFile> = files.iter().map(|(p, c)| SourceFile::new(*p, *c)).collect();
    extractor.extract_repo_structure(&mut parsers, &sources)
}

#[test]
fn test_llm_flag_propagates_to_callers() {
    let repo = scan(&[("llm.py", LLM_PY), ("trigger.py", TRIGGER_PY)]);

    let generate = repo.function(Path::new("llm.py"), "generate").unwrap();
    assert!(generate.has_llm_call);
    assert_eq!(generate.llm_calls, vec!["client.chat.completions.create"]);

    assert!(repo.function(Path::new("trigger.py"), "handle_webhook").unwrap().has_llm_call);
    assert!(!repo.function(Path::new("trigger.py"), "health").unwrap().has_llm_call);

    assert_eq!(repo.cross_file_calls.len(), 1);
    assert_eq!(repo.cross_file_calls[0].caller.function, "handle_webhook");
    assert_eq!(repo.cross_file_calls[0].caller.line, 6);
    assert_eq!(repo.cross_file_calls[0].callee.file, Path::new("llm.py"));
}

#[test]
fn test_cross_file_call_from_named_import() {
    let repo = scan(&[
        ("src/a.ts", "import { foo } from './b';\n\nexport function run() {\n  return foo(1);\n}\n"),
        ("src/b.ts", "export function foo(x: number) {\n  return x;\n}\n"),
        ("src/c.ts", "export function foo() {}\n"),
    ]);
    assert_eq!(repo.cross_file_calls.len(), 1);
    let call = &repo.cross_file_calls[0];
    assert_eq!(call.caller.file, Path::new("src/a.ts"));
    assert_eq!(call.callee.file, Path::new("src/b.ts"));
    assert_eq!(call.callee.function, "foo");
}

#[test]
fn test_structural_hash_is_stable() {
    let extractor = Extractor::default();
    let mut parsers = ParserManager::new();
    let first = extractor.extract_call_graph(&mut parsers, LLM_PY, Path::new("llm.py"));
    let second = extractor.extract_call_graph(&mut parsers, LLM_PY, Path::new("llm.py"));
    assert_eq!(first.structural_hash, second.structural_hash);
    assert!(!diff_call_graphs(&first, &second).has_structural_change());
}

#[test]
fn test_degenerate_inputs_yield_empty_results() {
    let extractor = Extractor::default();
    let mut parsers = ParserManager::new();
    for (path, code) in [("notes.txt", "def x(): pass"), ("empty.py", ""), ("blank.ts", "  \n\n")] {
        let structure = extractor.extract_file_structure(&mut parsers, code, Path::new(path));
        assert!(structure.functions.is_empty(), "{}", path);
        assert!(structure.imports.is_empty(), "{}", path);
        assert!(structure.exports.is_empty(), "{}", path);
        assert!(structure.route_handlers.is_empty(), "{}", path);
    }
    // Syntax errors still produce whatever parsed.
    let broken = extractor.extract_file_structure(&mut parsers, "def ok():\n    pass\n\ndef (:\n", Path::new("bad.py"));
    assert!(broken.function("ok").is_some());
}

#[test]
fn test_tree_handles_balance() {
    let extractor = Extractor::default();
    let mut parsers = ParserManager::new();
    for i in 0..5 {
        let path = format!("f{}.py", i);
        extractor.extract_call_graph(&mut parsers, TRIGGER_PY, Path::new(&path));
        extractor.extract_file_structure(&mut parsers, LLM_PY, Path::new(&path));
    }
    let stats = parsers.stats();
    assert_eq!(stats.handles_acquired, 10);
    assert_eq!(stats.handles_released, 10);
    assert_eq!(parsers.cached_tree_count(), 5);
    assert!(!stats.is_balanced());

    parsers.dispose();
    assert!(parsers.stats().is_balanced());
    assert_eq!(parsers.cached_tree_count(), 0);
}

#[test]
fn test_routes_across_frameworks() {
    let repo = scan(&[
        ("api/server.js", "const router = express.Router();\nrouter.delete('/items/:id', removeItem);\n"),
        ("svc/main.go", "package main\n\nfunc main() {\n\tr.POST(\"/v1/chat\", chatHandler)\n}\n"),
        ("app/api/summarize/route.ts", "export async function POST(req: Request) {\n  return new Response('');\n}\n"),
        ("py/app.py", "@bp.route('/upload', methods=['PUT'])\ndef upload():\n    pass\n"),
    ]);
    let mut routes: Vec<(String, String, RouteSource)> = repo
        .http_route_handlers
        .iter()
        .map(|h| (h.method.clone(), h.path.clone(), h.detected_by))
        .collect();
    routes.sort_by(|a, b| a.1.cmp(&b.1));
    assert_eq!(
        routes,
        vec![
            ("POST".to_string(), "/api/summarize".to_string(), RouteSource::FileConvention),
            ("DELETE".to_string(), "/items/:id".to_string(), RouteSource::RouterCall),
            ("PUT".to_string(), "/upload".to_string(), RouteSource::Decorator),
            ("POST".to_string(), "/v1/chat".to_string(), RouteSource::RouterCall),
        ]
    );
}

#[test]
fn test_http_clients_across_languages() {
    let repo = scan(&[
        ("ui/a.ts", "export async function load() {\n  return axios.put(`/api/doc/${id}`, body);\n}\n"),
        ("cli/b.py", "def push():\n    requests.post('http://localhost:8000/api/doc/1')\n"),
        ("cli/c.py", "def pull():\n    requests.get(BASE_URL)\n"),
    ]);
    let mut clients: Vec<(&str, &str, &str)> = repo
        .http_client_calls
        .iter()
        .map(|c| (c.function.as_str(), c.method.as_str(), c.path.as_str()))
        .collect();
    clients.sort();
    assert_eq!(clients, vec![("load", "PUT", "/api/doc/:param"), ("push", "POST", "/api/doc/1")]);
}

struct Keyword(&'static str);

impl LlmMatcher for Keyword {
    fn is_llm_identifier(&self, text: &str) -> bool {
        text.contains(self.0)
    }

    fn is_llm_call(&self, callee: &str) -> bool {
        callee.ends_with(&format!("{}.ask", self.0))
    }

    fn might_contain_llm(&self, source: &str) -> bool {
        source.contains(self.0)
    }
}

#[test]
fn test_injected_matcher() {
    let extractor = Extractor::with_matcher(Arc::new(Keyword("oracle")), &AnalysisConfig::default());
    let mut parsers = ParserManager::new();
    let code = "def a():\n    oracle.ask()\n\ndef b():\n    client.chat.completions.create()\n";
    let structure = extractor.extract_file_structure(&mut parsers, code, Path::new("m.py"));
    assert!(structure.function("a").unwrap().has_llm_call);
    assert!(!structure.function("b").unwrap().has_llm_call);
}

#[test]
fn test_language_coverage() {
    let extractor = Extractor::default();
    let mut parsers = ParserManager::new();
    let samples = [
        ("x.py", "def f():\n    g()\n", Language::Python),
        ("x.ts", "function f() { g(); }\n", Language::TypeScript),
        ("x.tsx", "function f() { return <div>{g()}</div>; }\n", Language::Tsx),
        ("x.js", "function f() { g(); }\n", Language::JavaScript),
        ("x.go", "package x\n\nfunc f() {\n\tg()\n}\n", Language::Go),
        ("x.rs", "fn f() {\n    g();\n}\n", Language::Rust),
        ("x.c", "void f(void) {\n    g();\n}\n", Language::C),
        ("x.cpp", "void f() {\n    g();\n}\n", Language::Cpp),
        ("x.swift", "func f() {\n    g()\n}\n", Language::Swift),
        ("X.java", "class X {\n    void f() {\n        g();\n    }\n}\n", Language::Java),
        ("x.lua", "function f()\n  g()\nend\n", Language::Lua),
    ];
    for (path, code, language) in samples {
        let structure = extractor.extract_file_structure(&mut parsers, code, Path::new(path));
        assert_eq!(structure.language, Some(language), "{}", path);
        let f = structure.function("f").unwrap_or_else(|| panic!("no f in {}", path));
        assert_eq!(f.calls, vec!["g"], "{}", path);
    }
}

#[test]
fn test_static_graph_clusters() {
    let pipeline = "from llm import generate\n\ndef clean(x):\n    return generate(x)\n\ndef rank(x):\n    return clean(x)\n\ndef pick(x):\n    return rank(x)\n";
    let repo = scan(&[("llm.py", LLM_PY), ("trigger.py", TRIGGER_PY), ("pipeline.py", pipeline)]);
    let (nodes, edges) = build_workflow_graph(&repo);
    assert_eq!(nodes.len(), 5);
    assert_eq!(edges.len(), 4);

    let detection = WorkflowDetector::new().detect(&nodes, &edges, None);
    assert_eq!(detection.workflows.len(), 1);
    assert_eq!(detection.workflows[0].name, "generate workflow");
    assert_eq!(detection.workflows[0].node_ids.len(), 5);
}

#[test]
fn test_file_structure_snapshot() {
    let extractor = Extractor::default();
    let mut parsers = ParserManager::new();
    let structure = extractor.extract_file_structure(&mut parsers, TRIGGER_PY, Path::new("trigger.py"));
    insta::assert_json_snapshot!(structure, @r#"
    {
      "file": "trigger.py",
      "language": "python",
      "functions": [
        {
          "name": "handle_webhook",
          "file": "trigger.py",
          "startLine": 4,
          "endLine": 6,
          "params": [
            "payload"
          ],
          "isAsync": false,
          "isExported": true,
          "calls": [
            "generate"
          ],
          "callSites": [
            {
              "callee": "generate",
              "line": 6
            }
          ],
          "hasLLMCall": false
        },
        {
          "name": "health",
          "file": "trigger.py",
          "startLine": 8,
          "endLine": 9,
          "params": [],
          "isAsync": false,
          "isExported": true,
          "calls": [],
          "hasLLMCall": false
        }
      ],
      "imports": [
        {
          "source": "llm",
          "names": [
            {
              "name": "generate"
            }
          ],
          "line": 2
        }
      ],
      "exports": [
        "handle_webhook",
        "health"
      ],
      "routeHandlers": [],
      "httpCalls": []
    }
    "#);
}
