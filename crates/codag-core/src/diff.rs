//! Graph diff computation for incremental updates

use crate::model::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Added, removed and updated items of one kind. `removed` holds ids only;
/// `updated` holds the new version of each changed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet<T> {
    pub added: Vec<T>,
    pub removed: Vec<String>,
    pub updated: Vec<T>,
}

impl<T> ChangeSet<T> {
    pub fn new() -> Self {
        ChangeSet {
            added: Vec::new(),
            removed: Vec::new(),
            updated: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Represents the change between two graph snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDiff {
    pub nodes: ChangeSet<WorkflowNode>,
    /// Edges are keyed by `source->target`.
    pub edges: ChangeSet<WorkflowEdge>,
    pub workflows: ChangeSet<WorkflowGroup>,
}

impl GraphDiff {
    /// Check if this diff is empty (no changes).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.workflows.is_empty()
    }

    /// Ids of every added item across all kinds (edges by composite key).
    pub fn added_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.nodes.added.iter().map(|n| n.id.clone()).collect();
        ids.extend(self.edges.added.iter().map(WorkflowEdge::key));
        ids.extend(self.workflows.added.iter().map(|w| w.id.clone()));
        ids
    }

    /// Ids of every removed item across all kinds.
    pub fn removed_ids(&self) -> Vec<String> {
        let mut ids = self.nodes.removed.clone();
        ids.extend(self.edges.removed.iter().cloned());
        ids.extend(self.workflows.removed.iter().cloned());
        ids
    }
}

/// True iff any collection of any kind is non-empty.
pub fn has_diff(diff: &GraphDiff) -> bool {
    !diff.is_empty()
}

/// Compute the difference between two graph states.
pub fn compute_graph_diff(old: &GraphSnapshot, new: &GraphSnapshot) -> GraphDiff {
    GraphDiff {
        nodes: diff_keyed(&old.nodes, &new.nodes, |n| n.id.clone(), node_changed),
        edges: diff_keyed(&old.edges, &new.edges, WorkflowEdge::key, edge_changed),
        workflows: diff_keyed(&old.workflows, &new.workflows, |w| w.id.clone(), workflow_changed),
    }
}

fn node_changed(old: &WorkflowNode, new: &WorkflowNode) -> bool {
    old.label != new.label
        || old.kind != new.kind
        || old.description != new.description
        || old.is_entry_point != new.is_entry_point
        || old.is_exit_point != new.is_exit_point
        || old.is_critical_path != new.is_critical_path
        || old.source != new.source
}

fn edge_changed(old: &WorkflowEdge, new: &WorkflowEdge) -> bool {
    old.label != new.label || old.is_critical_path != new.is_critical_path
}

fn workflow_changed(old: &WorkflowGroup, new: &WorkflowGroup) -> bool {
    old.name != new.name
        || old.description != new.description
        || old.sorted_node_ids() != new.sorted_node_ids()
}

/// Id-keyed comparison. Output is ordered by key; a duplicated key keeps its
/// last occurrence.
fn diff_keyed<T: Clone>(
    old: &[T],
    new: &[T],
    key: impl Fn(&T) -> String,
    changed: impl Fn(&T, &T) -> bool,
) -> ChangeSet<T> {
    let old_by_key: BTreeMap<String, &T> = old.iter().map(|item| (key(item), item)).collect();
    let new_by_key: BTreeMap<String, &T> = new.iter().map(|item| (key(item), item)).collect();

    let mut set = ChangeSet::new();
    for (id, item) in &new_by_key {
        match old_by_key.get(id) {
            None => set.added.push((*item).clone()),
            Some(previous) if changed(*previous, *item) => set.updated.push((*item).clone()),
            Some(_) => {}
        }
    }
    for id in old_by_key.keys() {
        if !new_by_key.contains_key(id) {
            set.removed.push(id.clone());
        }
    }
    set
}
