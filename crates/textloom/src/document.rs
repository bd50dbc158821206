//! Tree documents: the persisted form of a graph plus its selection.
//!
//! Documents written by the engine load back unchanged. Documents from
//! elsewhere are repaired on the way in: dangling parent ids are dropped,
//! cycles are broken, text is normalized and interrupted generations are
//! marked failed. A document whose shape is wrong is rejected outright.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;

use crate::error::{EngineError, Result};
use crate::graph::Graph;
use crate::path::{is_valid_path, resolve_path};
use crate::text::normalize_newlines;
use crate::types::{Node, NodeId, NodeStatus};

/// Status given to placeholders whose generation did not survive a reload.
pub const INTERRUPTED: &str = "generation interrupted";

/// # JSON shape
///
/// ```json
/// {
///   "nodes": { "<id>": { "text": "…", "kind": "human", "parentIds": [] } },
///   "selectedNodeId": "<id>",
///   "selectedPath": ["<root id>", "…", "<id>"]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDocument {
    pub nodes: IndexMap<NodeId, Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_path: Option<Vec<NodeId>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    nodes: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    selected_node_id: Option<NodeId>,
    #[serde(default)]
    selected_path: Option<Vec<NodeId>>,
}

impl TreeDocument {
    /// Capture `graph` with `path` as the selection.
    pub fn snapshot(graph: &Graph, path: &[NodeId]) -> Self {
        Self {
            nodes: graph.nodes().clone(),
            selected_node_id: path.last().cloned(),
            selected_path: (!path.is_empty()).then(|| path.to_vec()),
        }
    }

    /// Parse a document. Syntax errors surface as [`EngineError::Json`];
    /// a well-formed document of the wrong shape is
    /// [`EngineError::MalformedDocument`].
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawDocument = serde_json::from_str(json).map_err(|e| match e.classify() {
            Category::Data => EngineError::MalformedDocument(e.to_string()),
            _ => EngineError::Json(e),
        })?;

        let mut nodes = IndexMap::with_capacity(raw.nodes.len());
        for (key, value) in raw.nodes {
            let mut node: Node = serde_json::from_value(value)
                .map_err(|e| EngineError::MalformedDocument(format!("node {key}: {e}")))?;
            if !node.id.is_empty() && node.id != key {
                tracing::warn!(key = %key, id = %node.id, "node id differs from its key, using the key");
            }
            node.id = key.clone();
            nodes.insert(key, node);
        }

        Ok(Self {
            nodes,
            selected_node_id: raw.selected_node_id,
            selected_path: raw.selected_path,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Turn the document into a consistent graph and a valid selection path.
    pub fn repair(self) -> (Graph, Vec<NodeId>) {
        let mut nodes = self.nodes;
        let ids: IndexSet<NodeId> = nodes.keys().cloned().collect();

        for node in nodes.values_mut() {
            let normalized = normalize_newlines(&node.text);
            node.text = normalized;
            if node.is_loading() {
                tracing::warn!(node = %node.id, "marking interrupted generation as failed");
                node.status = NodeStatus::Failed(INTERRUPTED.to_string());
            }

            let mut parents: Vec<NodeId> = Vec::with_capacity(node.parent_ids.len());
            for parent in node.parent_ids.drain(..) {
                if !ids.contains(&parent) {
                    tracing::warn!(node = %node.id, parent = %parent, "dropping dangling parent");
                } else if parent != node.id && !parents.contains(&parent) {
                    parents.push(parent);
                }
            }
            node.parent_ids = parents;
        }

        break_cycles(&mut nodes);
        let graph = Graph::from_nodes(nodes);
        let path = selection(&graph, self.selected_node_id, self.selected_path);
        (graph, path)
    }
}

/// Repeatedly cut the parent links of the first node stuck in a cycle
/// until every node is reachable from a root.
fn break_cycles(nodes: &mut IndexMap<NodeId, Node>) {
    loop {
        let stuck = unsorted(nodes);
        let Some(victim) = stuck.first().cloned() else {
            return;
        };
        let has_root = nodes.values().any(Node::is_root);

        let Some(node) = nodes.get_mut(&victim) else {
            return;
        };
        node.parent_ids.retain(|p| !stuck.contains(p));
        tracing::warn!(node = %victim, "breaking parent cycle");

        if node.parent_ids.is_empty() && !has_root {
            let anchor = Node::human("");
            node.parent_ids = vec![anchor.id.clone()];
            tracing::warn!(anchor = %anchor.id, "synthesizing root for rootless document");
            nodes.insert(anchor.id.clone(), anchor);
        }
    }
}

/// Nodes a topological sort never reaches, in document order.
fn unsorted(nodes: &IndexMap<NodeId, Node>) -> IndexSet<NodeId> {
    let mut placed: IndexSet<NodeId> = IndexSet::new();
    loop {
        let before = placed.len();
        for node in nodes.values() {
            if !placed.contains(&node.id) && node.parent_ids.iter().all(|p| placed.contains(p)) {
                placed.insert(node.id.clone());
            }
        }
        if placed.len() == before {
            break;
        }
    }
    nodes
        .keys()
        .filter(|id| !placed.contains(*id))
        .cloned()
        .collect()
}

fn selection(graph: &Graph, focus: Option<NodeId>, path: Option<Vec<NodeId>>) -> Vec<NodeId> {
    let hint = path.unwrap_or_default();
    let focus = focus
        .filter(|f| graph.contains(f))
        .or_else(|| hint.last().filter(|f| graph.contains(f)).cloned());

    match focus {
        Some(focus) if hint.last() == Some(&focus) && is_valid_path(graph, &hint) => hint,
        Some(focus) => {
            tracing::debug!(focus = %focus, "recomputing selection path");
            resolve_path(graph, &focus, &hint)
        }
        None => graph.roots().into_iter().take(1).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationMeta, NodeKind};

    #[test]
    fn test_snapshot_roundtrip() {
        let mut graph = Graph::new();
        graph.insert(Node::human("a").with_id("a"));
        graph.insert(
            Node::ai("b", GenerationMeta::new("m"))
                .with_id("b")
                .with_parent("a"),
        );
        let path: Vec<NodeId> = vec!["a".into(), "b".into()];
        let doc = TreeDocument::snapshot(&graph, &path);
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"selectedNodeId\": \"b\""));

        let back = TreeDocument::from_json(&json).unwrap();
        assert_eq!(back, doc);
        let (repaired, repaired_path) = back.repair();
        assert_eq!(repaired, graph);
        assert_eq!(repaired_path, path);
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let err = TreeDocument::from_json(r#"{"nodes": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, EngineError::MalformedDocument(_)));
        let err = TreeDocument::from_json(r#"{"selectedNodeId": "x"}"#).unwrap_err();
        assert!(matches!(err, EngineError::MalformedDocument(_)));
        let err = TreeDocument::from_json(r#"{"nodes": {"a": {"kind": "robot"}}}"#).unwrap_err();
        assert!(matches!(err, EngineError::MalformedDocument(_)));
        let err = TreeDocument::from_json("{not json").unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }

    #[test]
    fn test_key_wins_over_inner_id() {
        let doc = TreeDocument::from_json(r#"{"nodes": {"k": {"id": "other", "text": "x"}}}"#)
            .unwrap();
        assert_eq!(doc.nodes["k"].id, "k");
    }

    #[test]
    fn test_repair_cleans_nodes() {
        let json = r#"{
            "nodes": {
                "r": {"text": "one\r\ntwo"},
                "c": {"text": "", "kind": "ai", "parentIds": ["r", "ghost", "r"], "status": {"state": "loading"}}
            }
        }"#;
        let (graph, path) = TreeDocument::from_json(json).unwrap().repair();
        assert_eq!(graph.get("r").unwrap().text, "one\ntwo");
        let c = graph.get("c").unwrap();
        assert_eq!(c.parent_ids, vec!["r".to_string()]);
        assert_eq!(c.kind, NodeKind::Ai);
        assert_eq!(c.status, NodeStatus::Failed(INTERRUPTED.into()));
        // No selection stored: falls back to the first root.
        assert_eq!(path, vec!["r"]);
    }

    #[test]
    fn test_repair_breaks_cycle_and_synthesizes_root() {
        let json = r#"{
            "nodes": {
                "a": {"text": "a", "parentIds": ["b"]},
                "b": {"text": "b", "parentIds": ["a"]}
            },
            "selectedNodeId": "b"
        }"#;
        let (graph, path) = TreeDocument::from_json(json).unwrap().repair();
        assert!(graph.is_acyclic());
        assert!(graph.is_rooted());
        assert_eq!(graph.roots().len(), 1);
        assert_eq!(path.last().map(String::as_str), Some("b"));
        assert!(is_valid_path(&graph, &path));
    }

    #[test]
    fn test_repair_cycle_below_existing_root() {
        let json = r#"{
            "nodes": {
                "r": {"text": "r"},
                "a": {"text": "a", "parentIds": ["r", "b"]},
                "b": {"text": "b", "parentIds": ["a"]}
            }
        }"#;
        let (graph, _) = TreeDocument::from_json(json).unwrap().repair();
        assert!(graph.is_acyclic());
        assert_eq!(graph.get("a").unwrap().parent_ids, vec!["r".to_string()]);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_invalid_selected_path_is_recomputed() {
        let json = r#"{
            "nodes": {
                "r": {"text": "r"},
                "a": {"text": "a", "parentIds": ["r"]}
            },
            "selectedNodeId": "a",
            "selectedPath": ["a"]
        }"#;
        let (_, path) = TreeDocument::from_json(json).unwrap().repair();
        assert_eq!(path, vec!["r", "a"]);
    }
}
