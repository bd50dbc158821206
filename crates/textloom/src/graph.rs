//! The graph store: an insertion-ordered arena of nodes keyed by id.
//!
//! Edges live only in [`Node::parent_ids`]; children are derived by scanning
//! the arena, so "first child" always means "earliest inserted child".

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::types::{Node, NodeId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already-validated node map.
    pub fn from_nodes(nodes: IndexMap<NodeId, Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &IndexMap<NodeId, Node> {
        &self.nodes
    }

    pub fn into_nodes(self) -> IndexMap<NodeId, Node> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Add a node. Its parents must already be in the store, which is what
    /// keeps the graph acyclic.
    pub fn insert(&mut self, node: Node) -> NodeId {
        debug_assert!(
            node.parent_ids.iter().all(|p| self.nodes.contains_key(p)),
            "node {} points at a parent that does not exist",
            node.id
        );
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Remove a single node without touching its children's edges.
    pub fn remove(&mut self, id: &str) -> Option<Node> {
        self.nodes.shift_remove(id)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Direct children of `id`, in insertion order.
    pub fn children(&self, id: &str) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.parent_ids.iter().any(|p| p == id))
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn has_children(&self, id: &str) -> bool {
        self.nodes
            .values()
            .any(|n| n.parent_ids.iter().any(|p| p == id))
    }

    /// All nodes reachable below `id` (exclusive), breadth-first.
    pub fn descendants(&self, id: &str) -> Vec<NodeId> {
        let mut child_map: HashMap<&str, Vec<&str>> = HashMap::new();
        for node in self.nodes.values() {
            for parent in &node.parent_ids {
                child_map
                    .entry(parent.as_str())
                    .or_default()
                    .push(node.id.as_str());
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut result = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for &child in child_map.get(current).map(Vec::as_slice).unwrap_or(&[]) {
                if seen.insert(child) {
                    result.push(child.to_string());
                    queue.push_back(child);
                }
            }
        }
        result
    }

    /// Walk every parent link from `id`, returning all ancestor ids (inclusive).
    pub fn ancestors(&self, id: &str) -> HashSet<NodeId> {
        let mut result = HashSet::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if result.insert(current.to_string())
                && let Some(node) = self.nodes.get(current)
            {
                for parent in &node.parent_ids {
                    stack.push(parent);
                }
            }
        }

        result
    }

    /// Nodes without parents, in insertion order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.is_root())
            .map(|n| n.id.clone())
            .collect()
    }

    /// Every node that is an ancestor (inclusive) of a loading placeholder.
    /// Structural edits must leave these alone until generation settles.
    pub fn pinned(&self) -> HashSet<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.is_loading())
            .flat_map(|n| self.ancestors(&n.id))
            .collect()
    }

    /// Swap `old` in `child`'s parent list for `replacements`, keeping the
    /// position and dropping duplicates.
    pub fn replace_parent(&mut self, child: &str, old: &str, replacements: &[NodeId]) {
        let Some(node) = self.nodes.get_mut(child) else {
            return;
        };
        let mut next: Vec<NodeId> = Vec::with_capacity(node.parent_ids.len() + replacements.len());
        for parent in node.parent_ids.drain(..) {
            if parent == old {
                for r in replacements {
                    if r != child && !next.contains(r) {
                        next.push(r.clone());
                    }
                }
            } else if !next.contains(&parent) {
                next.push(parent);
            }
        }
        node.parent_ids = next;
    }

    /// Move every current child of `from` onto `onto` (see [`Graph::replace_parent`]).
    /// Returns the children that were moved.
    pub fn reparent_children(&mut self, from: &str, onto: &[NodeId]) -> Vec<NodeId> {
        let children = self.children(from);
        for child in &children {
            self.replace_parent(child, from, onto);
        }
        children
    }

    /// True when no node can reach itself through parent links.
    pub fn is_acyclic(&self) -> bool {
        let mut indegree: HashMap<&str, usize> = HashMap::new();
        let mut child_map: HashMap<&str, Vec<&str>> = HashMap::new();
        for node in self.nodes.values() {
            let parents = node
                .parent_ids
                .iter()
                .filter(|p| self.nodes.contains_key(p.as_str()))
                .count();
            indegree.insert(node.id.as_str(), parents);
            for parent in &node.parent_ids {
                child_map
                    .entry(parent.as_str())
                    .or_default()
                    .push(node.id.as_str());
            }
        }

        let mut ready: Vec<&str> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0;
        while let Some(id) = ready.pop() {
            visited += 1;
            for &child in child_map.get(id).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(d) = indegree.get_mut(child) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(child);
                    }
                }
            }
        }
        visited == self.nodes.len()
    }

    /// True when every node reaches some root through existing parents.
    pub fn is_rooted(&self) -> bool {
        self.nodes.values().all(|n| {
            self.ancestors(&n.id)
                .iter()
                .any(|a| self.nodes.get(a.as_str()).is_some_and(Node::is_root))
        })
    }
}
