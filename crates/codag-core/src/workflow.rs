//! Workflow detection: clustering the node/edge graph into workflow groups
//!
//! Two strategies. When an upstream pass supplies [`WorkflowHint`]s, those seed
//! membership and the detector grows, merges and splits them (the metadata
//! path). Without hints, every LLM node seeds a cluster that is grown by BFS
//! (the fallback path).
//!
//! The metadata path rewrites the graph: it adds synthetic title and reference
//! nodes and retargets edges that cross workflows. Callers must render the
//! `nodes`/`edges` of the returned [`Detection`], not their own input.

use crate::graph::WorkflowGraph;
use crate::merge::{is_http_edge_label, merge_linked};
use crate::model::{NodeKind, WorkflowComponent, WorkflowEdge, WorkflowGroup, WorkflowHint, WorkflowNode};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Graphs smaller than this are not clustered at all.
pub const MIN_NODES_FOR_CLUSTERING: usize = 5;

/// Upper bound on orphan adoption passes.
pub const MAX_ADOPTION_PASSES: usize = 10;

/// Smallest BFS cluster the fallback path turns into a workflow.
pub const MIN_FALLBACK_CLUSTER: usize = 3;

/// Output of one detection run.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub workflows: Vec<WorkflowGroup>,
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
}

impl Detection {
    fn unchanged(nodes: &[WorkflowNode], edges: &[WorkflowEdge]) -> Self {
        Detection {
            workflows: Vec::new(),
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
        }
    }

    /// The workflow a node ended up in, if any.
    pub fn workflow_of(&self, node_id: &str) -> Option<&WorkflowGroup> {
        self.workflows
            .iter()
            .find(|w| w.node_ids.iter().any(|id| id == node_id))
    }
}

/// Clusters workflow graphs. Holds only tuning knobs, no state between calls.
#[derive(Debug, Clone)]
pub struct WorkflowDetector {
    max_adoption_passes: usize,
}

impl WorkflowDetector {
    pub fn new() -> Self {
        WorkflowDetector {
            max_adoption_passes: MAX_ADOPTION_PASSES,
        }
    }

    pub fn with_max_adoption_passes(mut self, passes: usize) -> Self {
        self.max_adoption_passes = passes;
        self
    }

    /// Detect workflows. Non-empty `hints` select the metadata path.
    pub fn detect(
        &self,
        nodes: &[WorkflowNode],
        edges: &[WorkflowEdge],
        hints: Option<&[WorkflowHint]>,
    ) -> Detection {
        if nodes.len() < MIN_NODES_FOR_CLUSTERING {
            debug!("Graph has {} nodes, too small to cluster", nodes.len());
            return Detection::unchanged(nodes, edges);
        }

        let mut detection = match hints {
            Some(hints) if !hints.is_empty() => self.detect_with_hints(nodes, edges, hints),
            _ => detect_by_bfs(nodes, edges),
        };

        detection
            .workflows
            .sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        debug!("Detected {} workflows", detection.workflows.len());
        detection
    }

    fn detect_with_hints(
        &self,
        nodes: &[WorkflowNode],
        edges: &[WorkflowEdge],
        hints: &[WorkflowHint],
    ) -> Detection {
        let graph = WorkflowGraph::new(nodes, edges);
        let hints = merge_hints(hints);

        let mut membership: HashMap<String, usize> = HashMap::new();
        for (index, hint) in hints.iter().enumerate() {
            for id in &hint.node_ids {
                if graph.contains(id) {
                    membership.entry(id.clone()).or_insert(index);
                }
            }
        }

        let passes = adopt_orphans(&mut membership, edges, &graph, self.max_adoption_passes);
        debug!("Orphan adoption settled after {} passes", passes);

        let links: Vec<(usize, usize)> = edges
            .iter()
            .filter(|e| e.label.as_deref().map_or(false, is_http_edge_label))
            .filter_map(|e| Some((*membership.get(&e.source)?, *membership.get(&e.target)?)))
            .filter(|(a, b)| a != b)
            .collect();
        let merged = merge_linked(hints.len(), &links);

        let mut final_index = vec![0usize; hints.len()];
        for (group_index, group) in merged.iter().enumerate() {
            for &hint_index in group {
                final_index[hint_index] = group_index;
            }
        }
        let assigned: HashMap<&str, usize> = membership
            .iter()
            .map(|(id, &hint_index)| (id.as_str(), final_index[hint_index]))
            .collect();

        let mut members: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); merged.len()];
        for (&id, &group_index) in &assigned {
            members[group_index].insert(id);
        }

        let mut builder = Rewrite::new(nodes);
        let mut workflows: Vec<WorkflowGroup> = Vec::with_capacity(merged.len());

        for (group_index, group) in merged.iter().enumerate() {
            let lead = &hints[group[0]];
            let description = group.iter().find_map(|&i| hints[i].description.clone());
            let pieces = graph.components_within(&members[group_index]);

            let mut components = Vec::new();
            if pieces.len() > 1 {
                for (part, piece) in pieces.iter().enumerate() {
                    let title_id = format!("{}__title_{}", lead.id, part);
                    let label = format!("{} ({}/{})", lead.name, part + 1, pieces.len());
                    let mut title = WorkflowNode::new(
                        title_id.clone(),
                        label,
                        NodeKind::WorkflowTitle {
                            workflow_id: lead.id.clone(),
                        },
                    );
                    title.is_entry_point = true;
                    builder.add_synthetic(group_index, title);

                    let mut entries = graph.entry_nodes(piece);
                    if entries.is_empty() {
                        entries.push(piece[0]);
                    }
                    for entry in entries {
                        builder.title_edges.push(WorkflowEdge::new(title_id.clone(), entry));
                    }

                    components.push(WorkflowComponent {
                        id: format!("{}__part_{}", lead.id, part),
                        title_node_id: title_id,
                        node_ids: piece.iter().map(|id| id.to_string()).collect(),
                    });
                }
            }

            workflows.push(WorkflowGroup {
                id: lead.id.clone(),
                name: lead.name.clone(),
                description,
                node_ids: members[group_index].iter().map(|id| id.to_string()).collect(),
                components,
            });
        }

        let keep: Vec<bool> = members
            .iter()
            .map(|set| set.iter().any(|id| graph.node(id).map_or(false, |n| n.kind.is_llm())))
            .collect();
        for (group_index, workflow) in workflows.iter().enumerate() {
            if !keep[group_index] {
                debug!("Dropping workflow '{}': no LLM node", workflow.name);
            }
        }

        // References only link surviving workflows.
        for edge in edges {
            let source = assigned.get(edge.source.as_str()).copied();
            let target = assigned.get(edge.target.as_str()).copied();
            match (source, target) {
                (Some(from), Some(to)) if from != to && keep[from] && keep[to] => {
                    let reference_id = format!("{}__ref__{}", workflows[from].id, edge.target);
                    if !builder.owner.contains_key(&reference_id) {
                        let label = graph
                            .node(&edge.target)
                            .map(|n| n.label.clone())
                            .unwrap_or_else(|| edge.target.clone());
                        let reference = WorkflowNode::new(
                            reference_id.clone(),
                            label,
                            NodeKind::Reference {
                                target_workflow: workflows[to].id.clone(),
                                target_node: edge.target.clone(),
                            },
                        );
                        builder.add_synthetic(from, reference);
                    }
                    builder.edges.push(WorkflowEdge {
                        target: reference_id,
                        ..edge.clone()
                    });
                }
                _ => builder.edges.push(edge.clone()),
            }
        }

        builder.finish(workflows, &keep)
    }
}

impl Default for WorkflowDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates the rewritten node and edge collections of the metadata path.
struct Rewrite {
    nodes: Vec<WorkflowNode>,
    edges: Vec<WorkflowEdge>,
    title_edges: Vec<WorkflowEdge>,
    /// Synthetic node id -> owning workflow index.
    owner: HashMap<String, usize>,
    synthetic_ids: Vec<Vec<String>>,
}

impl Rewrite {
    fn new(nodes: &[WorkflowNode]) -> Self {
        Rewrite {
            nodes: nodes.to_vec(),
            edges: Vec::new(),
            title_edges: Vec::new(),
            owner: HashMap::new(),
            synthetic_ids: Vec::new(),
        }
    }

    fn add_synthetic(&mut self, workflow: usize, node: WorkflowNode) {
        if self.synthetic_ids.len() <= workflow {
            self.synthetic_ids.resize(workflow + 1, Vec::new());
        }
        self.synthetic_ids[workflow].push(node.id.clone());
        self.owner.insert(node.id.clone(), workflow);
        self.nodes.push(node);
    }

    /// Drop workflows with `keep == false` together with the title nodes
    /// they own and the edges touching those titles.
    fn finish(mut self, workflows: Vec<WorkflowGroup>, keep: &[bool]) -> Detection {
        let removed: HashSet<String> = self
            .owner
            .iter()
            .filter(|(_, workflow)| !keep[**workflow])
            .map(|(id, _)| id.clone())
            .collect();

        self.nodes.retain(|n| !removed.contains(&n.id));

        let mut edges = Vec::with_capacity(self.edges.len() + self.title_edges.len());
        for edge in self.edges.into_iter().chain(self.title_edges) {
            if removed.contains(&edge.source) || removed.contains(&edge.target) {
                continue;
            }
            edges.push(edge);
        }

        let workflows = workflows
            .into_iter()
            .enumerate()
            .filter(|(index, _)| keep[*index])
            .map(|(index, mut workflow)| {
                if let Some(extra) = self.synthetic_ids.get(index) {
                    workflow.node_ids.extend(extra.iter().cloned());
                }
                workflow
            })
            .collect();

        Detection {
            workflows,
            nodes: self.nodes,
            edges,
        }
    }
}

/// Collapse hint entries sharing an id (multi-batch duplicates). The first
/// entry's name wins; node ids are unioned in first-seen order.
pub fn merge_hints(hints: &[WorkflowHint]) -> Vec<WorkflowHint> {
    let mut merged: Vec<WorkflowHint> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for hint in hints {
        match position.get(hint.id.as_str()) {
            Some(&index) => {
                let target = &mut merged[index];
                for id in &hint.node_ids {
                    if !target.node_ids.contains(id) {
                        target.node_ids.push(id.clone());
                    }
                }
                if target.description.is_none() {
                    target.description = hint.description.clone();
                }
            }
            None => {
                position.insert(hint.id.as_str(), merged.len());
                let mut first = hint.clone();
                let mut seen = HashSet::new();
                first.node_ids.retain(|id| seen.insert(id.clone()));
                merged.push(first);
            }
        }
    }
    merged
}

/// Grow workflow membership along edges with exactly one assigned endpoint.
///
/// Each pass only looks at membership as it stood when the pass began, so a
/// chain of `n` unassigned nodes needs `n` passes. Stops at a fixed point or
/// after `max_passes`. Returns the number of passes that adopted something.
pub fn adopt_orphans(
    membership: &mut HashMap<String, usize>,
    edges: &[WorkflowEdge],
    graph: &WorkflowGraph<'_>,
    max_passes: usize,
) -> usize {
    for pass in 0..max_passes {
        let adopted = adoptable(membership, edges, graph);
        if adopted.is_empty() {
            return pass;
        }
        membership.extend(adopted);
    }

    let remaining = adoptable(membership, edges, graph).len();
    if remaining > 0 {
        warn!(
            "Orphan adoption hit the {} pass cap with {} nodes still adoptable",
            max_passes, remaining
        );
    }
    max_passes
}

fn adoptable(
    membership: &HashMap<String, usize>,
    edges: &[WorkflowEdge],
    graph: &WorkflowGraph<'_>,
) -> Vec<(String, usize)> {
    let mut adopted = Vec::new();
    let mut claimed: HashSet<&str> = HashSet::new();

    for edge in edges {
        if !graph.contains(&edge.source) || !graph.contains(&edge.target) {
            continue;
        }
        let orphan = match (membership.get(&edge.source), membership.get(&edge.target)) {
            (Some(&workflow), None) => Some((edge.target.as_str(), workflow)),
            (None, Some(&workflow)) => Some((edge.source.as_str(), workflow)),
            _ => None,
        };
        if let Some((id, workflow)) = orphan {
            if claimed.insert(id) {
                adopted.push((id.to_string(), workflow));
            }
        }
    }
    adopted
}

/// Fallback clustering: one bidirectional BFS cluster per unvisited LLM node.
fn detect_by_bfs(nodes: &[WorkflowNode], edges: &[WorkflowEdge]) -> Detection {
    let graph = WorkflowGraph::new(nodes, edges);
    let mut visited: HashSet<&str> = HashSet::new();
    let mut workflows = Vec::new();

    for id in graph.node_ids() {
        if visited.contains(id) {
            continue;
        }
        let Some(seed) = graph.node(id) else { continue };
        if !seed.kind.is_llm() {
            continue;
        }

        let cluster = graph.cluster_from(id);
        visited.extend(cluster.iter().copied());
        if cluster.len() < MIN_FALLBACK_CLUSTER {
            debug!("Cluster around '{}' has {} nodes, skipping", id, cluster.len());
            continue;
        }

        let mut node_ids: Vec<String> = cluster.iter().map(|id| id.to_string()).collect();
        node_ids.sort();
        workflows.push(WorkflowGroup {
            id: format!("workflow_{}", workflows.len() + 1),
            name: format!("{} workflow", seed.label),
            description: None,
            node_ids,
            components: Vec::new(),
        });
    }

    Detection {
        workflows,
        nodes: nodes.to_vec(),
        edges: edges.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm(id: &str) -> WorkflowNode {
        WorkflowNode::new(id, id, NodeKind::llm())
    }

    fn tool(id: &str) -> WorkflowNode {
        WorkflowNode::new(id, id, NodeKind::Tool)
    }

    fn hint(id: &str, name: &str, nodes: &[&str]) -> WorkflowHint {
        WorkflowHint {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            node_ids: nodes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_small_graph_is_not_clustered() {
        let nodes = vec![llm("a"), tool("b"), tool("c"), tool("d")];
        let edges = vec![WorkflowEdge::new("a", "b"), WorkflowEdge::new("b", "c")];
        let detection = WorkflowDetector::new().detect(&nodes, &edges, None);
        assert!(detection.workflows.is_empty());
        assert_eq!(detection.nodes, nodes);
    }

    #[test]
    fn test_merge_hints_unions_duplicate_ids() {
        let merged = merge_hints(&[
            hint("w1", "Chat", &["a", "b"]),
            hint("w2", "Index", &["x"]),
            hint("w1", "Chat (batch 2)", &["b", "c"]),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "Chat");
        assert_eq!(merged[0].node_ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_adoption_is_one_hop_per_pass() {
        let nodes = vec![llm("n1"), tool("n2"), tool("n3"), tool("n4")];
        let edges = vec![
            WorkflowEdge::new("n1", "n2"),
            WorkflowEdge::new("n2", "n3"),
            WorkflowEdge::new("n3", "n4"),
        ];
        let graph = WorkflowGraph::new(&nodes, &edges);

        let mut membership = HashMap::from([("n1".to_string(), 0)]);
        assert_eq!(adopt_orphans(&mut membership, &edges, &graph, 2), 2);
        assert_eq!(membership.len(), 3);
        assert!(!membership.contains_key("n4"));

        assert_eq!(adopt_orphans(&mut membership, &edges, &graph, 10), 1);
        assert_eq!(membership.len(), 4);
    }

    #[test]
    fn test_fallback_needs_three_members() {
        let nodes = vec![llm("a"), tool("b"), llm("c"), tool("d"), tool("e")];
        let edges = vec![
            WorkflowEdge::new("a", "b"),
            WorkflowEdge::new("c", "d"),
            WorkflowEdge::new("e", "d"),
        ];
        let detection = WorkflowDetector::new().detect(&nodes, &edges, None);
        assert_eq!(detection.workflows.len(), 1);
        assert_eq!(detection.workflows[0].node_ids, vec!["c", "d", "e"]);
        assert_eq!(detection.workflows[0].name, "c workflow");
    }

    #[test]
    fn test_workflow_without_llm_is_dropped() {
        let nodes = vec![llm("a"), tool("b"), tool("c"), tool("d"), tool("e")];
        let edges = vec![WorkflowEdge::new("a", "b"), WorkflowEdge::new("d", "e")];
        let hints = vec![hint("w1", "Chat", &["a"]), hint("w2", "Tools", &["d"])];
        let detection = WorkflowDetector::new().detect(&nodes, &edges, Some(&hints));

        assert_eq!(detection.workflows.len(), 1);
        assert_eq!(detection.workflows[0].id, "w1");
        assert_eq!(detection.workflows[0].node_ids, vec!["a", "b"]);
    }
}
