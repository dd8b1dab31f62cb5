//! Disjoint-set merging of workflows linked by HTTP edges

use petgraph::unionfind::UnionFind;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// `"GET /users"`, `"post /api/chat"`: an edge that crosses an HTTP boundary.
pub fn is_http_edge_label(label: &str) -> bool {
    static HTTP_LABEL: OnceLock<Regex> = OnceLock::new();
    HTTP_LABEL
        .get_or_init(|| {
            Regex::new(r"(?i)^\s*(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\s+/").expect("valid regex")
        })
        .is_match(label)
}

/// Merge `count` workflows along `links` (pairs of workflow indices).
///
/// Returns groups of indices, each sorted ascending, ordered by their smallest
/// member. The smallest index of a group is its representative.
pub fn merge_linked(count: usize, links: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut sets = UnionFind::new(count);
    for &(a, b) in links {
        if a < count && b < count {
            sets.union(a, b);
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for index in 0..count {
        let root = sets.find_mut(index);
        groups.entry(root).or_default().push(index);
    }

    let mut merged: Vec<Vec<usize>> = groups.into_values().collect();
    merged.sort_by_key(|group| group[0]);
    merged
}
