//! Workflow graph data model shared with the rendering layer
//!
//! Everything in here serializes to the camelCase JSON contract consumed by the
//! renderer and its cache. Bump [`CACHE_FORMAT_VERSION`] on any shape change.

use serde::{Deserialize, Serialize};

/// Version of the serialized snapshot shape.
pub const CACHE_FORMAT_VERSION: u32 = 3;

/// Where in the source a node comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub function: String,
}

/// Discriminates what a workflow node represents, with the payload that only
/// makes sense for that kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeKind {
    Trigger,
    Llm {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
    Tool,
    Decision,
    Integration,
    Memory,
    Parser,
    Output,
    /// Stand-in for a node that lives in another workflow.
    Reference {
        #[serde(rename = "targetWorkflow")]
        target_workflow: String,
        #[serde(rename = "targetNode")]
        target_node: String,
    },
    /// Synthetic heading for one disconnected piece of a workflow.
    WorkflowTitle {
        #[serde(rename = "workflowId")]
        workflow_id: String,
    },
}

impl NodeKind {
    /// Plain LLM node without a known model.
    pub fn llm() -> Self {
        NodeKind::Llm { model: None }
    }

    pub fn is_llm(&self) -> bool {
        matches!(self, NodeKind::Llm { .. })
    }

    /// Synthetic nodes are produced by clustering, never by analysis.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, NodeKind::Reference { .. } | NodeKind::WorkflowTitle { .. })
    }

    /// The wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Llm { .. } => "llm",
            NodeKind::Tool => "tool",
            NodeKind::Decision => "decision",
            NodeKind::Integration => "integration",
            NodeKind::Memory => "memory",
            NodeKind::Parser => "parser",
            NodeKind::Output => "output",
            NodeKind::Reference { .. } => "reference",
            NodeKind::WorkflowTitle { .. } => "workflow-title",
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A single node in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_entry_point: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_exit_point: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_critical_path: bool,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: NodeKind) -> Self {
        WorkflowNode {
            id: id.into(),
            label: label.into(),
            kind,
            description: None,
            source: None,
            is_entry_point: false,
            is_exit_point: false,
            is_critical_path: false,
        }
    }

    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }
}

/// A directed edge between two workflow nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_critical_path: bool,
}

impl WorkflowEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        WorkflowEdge {
            source: source.into(),
            target: target.into(),
            label: None,
            is_critical_path: false,
        }
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Composite identity used for diffing: `source->target`.
    pub fn key(&self) -> String {
        format!("{}->{}", self.source, self.target)
    }
}

/// One internally connected piece of a workflow, headed by a title node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowComponent {
    pub id: String,
    pub title_node_id: String,
    pub node_ids: Vec<String>,
}

/// A clustered group of nodes believed to form one LLM-involving code path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGroup {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub node_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<WorkflowComponent>,
}

impl WorkflowGroup {
    /// Node ids in sorted order, the form used for comparison.
    pub fn sorted_node_ids(&self) -> Vec<String> {
        let mut ids = self.node_ids.clone();
        ids.sort();
        ids
    }
}

/// Tentative workflow membership supplied by an upstream enrichment pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowHint {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub node_ids: Vec<String>,
}

/// Everything the renderer needs for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
    #[serde(default)]
    pub workflows: Vec<WorkflowGroup>,
}

fn default_version() -> u32 {
    CACHE_FORMAT_VERSION
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<WorkflowNode>, edges: Vec<WorkflowEdge>, workflows: Vec<WorkflowGroup>) -> Self {
        GraphSnapshot {
            version: CACHE_FORMAT_VERSION,
            generated_at: None,
            nodes,
            edges,
            workflows,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
