use std::collections::HashSet;

use crate::models::Node;

/// In-memory node collection for a single run.
///
/// Append-only and keyed by url. The visited set is separate from the stored
/// urls: a url is marked visited before its node is even built, so the same
/// entity is never fetched twice, even when it ends up not being stored.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    nodes: Vec<Node>,
    urls: HashSet<String>,
    visited: HashSet<String>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from the nodes of a prior run. Every node url counts
    /// as visited.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut store = Self::new();
        for node in nodes {
            store.mark_visited(node.url());
            store.add(node);
        }
        store
    }

    /// Append `node` unless its url is already stored. Returns whether it was added.
    pub fn add(&mut self, node: Node) -> bool {
        if !self.urls.insert(node.url().to_string()) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Check-and-mark: returns `true` if `url` was not visited before.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Snapshot of the nodes at `degree`, in insertion order.
    pub fn nodes_at_degree(&self, degree: usize) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|node| node.degree() == degree)
            .cloned()
            .collect()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}
