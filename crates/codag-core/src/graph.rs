//! Borrowed petgraph view over a flat workflow node/edge list

use crate::model::{WorkflowEdge, WorkflowNode};
use petgraph::graphmap::{DiGraphMap, UnGraphMap};
use petgraph::visit::Bfs;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet};

/// The workflow graph keyed by node id. Edges whose endpoints are not known
/// nodes are left out of the view.
pub struct WorkflowGraph<'a> {
    nodes: HashMap<&'a str, &'a WorkflowNode>,
    order: Vec<&'a str>,
    directed: DiGraphMap<&'a str, ()>,
    undirected: UnGraphMap<&'a str, ()>,
}

impl std::fmt::Debug for WorkflowGraph<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("node_count", &self.directed.node_count())
            .field("edge_count", &self.directed.edge_count())
            .finish()
    }
}

impl<'a> WorkflowGraph<'a> {
    pub fn new(nodes: &'a [WorkflowNode], edges: &'a [WorkflowEdge]) -> Self {
        let mut by_id = HashMap::with_capacity(nodes.len());
        let mut order = Vec::with_capacity(nodes.len());
        let mut directed = DiGraphMap::new();
        let mut undirected = UnGraphMap::new();

        for node in nodes {
            if by_id.insert(node.id.as_str(), node).is_none() {
                order.push(node.id.as_str());
                directed.add_node(node.id.as_str());
                undirected.add_node(node.id.as_str());
            }
        }

        for edge in edges {
            let (source, target) = (edge.source.as_str(), edge.target.as_str());
            if !by_id.contains_key(source) || !by_id.contains_key(target) {
                tracing::debug!("Skipping dangling edge {}", edge.key());
                continue;
            }
            directed.add_edge(source, target, ());
            undirected.add_edge(source, target, ());
        }

        WorkflowGraph {
            nodes: by_id,
            order,
            directed,
            undirected,
        }
    }

    /// Total number of distinct nodes.
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Total number of distinct directed edges between known nodes.
    pub fn edge_count(&self) -> usize {
        self.directed.edge_count()
    }

    pub fn node(&self, id: &str) -> Option<&'a WorkflowNode> {
        self.nodes.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node ids in input order.
    pub fn node_ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.order.iter().copied()
    }

    /// Every node reachable from `start` following edges in either direction.
    pub fn cluster_from(&self, start: &str) -> Vec<&'a str> {
        let Some((&start, _)) = self.nodes.get_key_value(start) else {
            return Vec::new();
        };
        let mut bfs = Bfs::new(&self.undirected, start);
        let mut cluster = Vec::new();
        while let Some(id) = bfs.next(&self.undirected) {
            cluster.push(id);
        }
        cluster
    }

    /// Connected pieces of the subgraph induced by `members`, ignoring edge
    /// direction. Pieces come out ordered by their smallest member id.
    pub fn components_within(&self, members: &BTreeSet<&'a str>) -> Vec<Vec<&'a str>> {
        let mut sub: UnGraphMap<&'a str, ()> = UnGraphMap::new();
        for &id in members {
            if self.contains(id) {
                sub.add_node(id);
            }
        }
        for (source, target, _) in self.directed.all_edges() {
            if members.contains(source) && members.contains(target) {
                sub.add_edge(source, target, ());
            }
        }

        let mut seen: HashSet<&'a str> = HashSet::new();
        let mut pieces = Vec::new();
        for &start in members {
            if seen.contains(start) || !sub.contains_node(start) {
                continue;
            }
            let mut bfs = Bfs::new(&sub, start);
            let mut piece = Vec::new();
            while let Some(id) = bfs.next(&sub) {
                seen.insert(id);
                piece.push(id);
            }
            piece.sort();
            pieces.push(piece);
        }
        pieces
    }

    /// Members of `piece` with no incoming edge from another member.
    pub fn entry_nodes(&self, piece: &[&'a str]) -> Vec<&'a str> {
        let members: HashSet<&str> = piece.iter().copied().collect();
        piece
            .iter()
            .copied()
            .filter(|&id| {
                self.directed
                    .neighbors_directed(id, Direction::Incoming)
                    .all(|pred| pred == id || !members.contains(pred))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;

    fn node(id: &str) -> WorkflowNode {
        WorkflowNode::new(id, id, NodeKind::Tool)
    }

    #[test]
    fn test_components_within_splits_disconnected_members() {
        let nodes = vec![node("a"), node("b"), node("c"), node("d")];
        let edges = vec![WorkflowEdge::new("a", "b"), WorkflowEdge::new("c", "d")];
        let graph = WorkflowGraph::new(&nodes, &edges);

        let members: BTreeSet<&str> = ["a", "b", "c", "d"].into_iter().collect();
        let pieces = graph.components_within(&members);
        assert_eq!(pieces, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_components_ignore_edges_leaving_members() {
        let nodes = vec![node("a"), node("b"), node("x")];
        let edges = vec![WorkflowEdge::new("a", "x"), WorkflowEdge::new("x", "b")];
        let graph = WorkflowGraph::new(&nodes, &edges);

        let members: BTreeSet<&str> = ["a", "b"].into_iter().collect();
        assert_eq!(graph.components_within(&members).len(), 2);
    }

    #[test]
    fn test_entry_nodes_and_cycle() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![WorkflowEdge::new("a", "b"), WorkflowEdge::new("b", "c")];
        let graph = WorkflowGraph::new(&nodes, &edges);
        assert_eq!(graph.entry_nodes(&["a", "b", "c"]), vec!["a"]);

        let cyclic = vec![WorkflowEdge::new("a", "b"), WorkflowEdge::new("b", "a")];
        let graph = WorkflowGraph::new(&nodes[..2], &cyclic);
        assert!(graph.entry_nodes(&["a", "b"]).is_empty());
    }

    #[test]
    fn test_cluster_from_follows_both_directions() {
        let nodes = vec![node("a"), node("b"), node("c"), node("lonely")];
        let edges = vec![
            WorkflowEdge::new("b", "a"),
            WorkflowEdge::new("b", "c"),
            WorkflowEdge::new("c", "ghost"),
        ];
        let graph = WorkflowGraph::new(&nodes, &edges);
        let mut cluster = graph.cluster_from("a");
        cluster.sort();
        assert_eq!(cluster, vec!["a", "b", "c"]);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.cluster_from("missing").is_empty());
    }
}
