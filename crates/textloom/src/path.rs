//! Path resolution: pick one root-to-node walk through the DAG.

use std::collections::HashSet;

use crate::error::EngineError;
use crate::graph::Graph;
use crate::types::NodeId;

/// Resolve the path from a root down to `node_id`, root first.
///
/// At a convergence node the parent listed in `hint` wins; without one the
/// first existing parent is taken. Parent ids missing from the store are
/// skipped. An unknown `node_id` yields an empty path.
///
/// # Examples
///
/// ```
/// use textloom::v1::{Graph, Node, resolve_path};
///
/// let mut graph = Graph::new();
/// graph.insert(Node::human("r").with_id("r"));
/// graph.insert(Node::human("x").with_id("x").with_parent("r"));
/// graph.insert(Node::human("y").with_id("y").with_parent("r"));
/// graph.insert(Node::human("m").with_id("m").with_parent("x").with_parent("y"));
///
/// assert_eq!(resolve_path(&graph, "m", &[]), vec!["r", "x", "m"]);
/// let hint = vec!["r".to_string(), "y".to_string()];
/// assert_eq!(resolve_path(&graph, "m", &hint), vec!["r", "y", "m"]);
/// assert!(resolve_path(&graph, "missing", &[]).is_empty());
/// ```
pub fn resolve_path(graph: &Graph, node_id: &str, hint: &[NodeId]) -> Vec<NodeId> {
    let hinted: HashSet<&str> = hint.iter().map(String::as_str).collect();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut path = Vec::new();
    let mut current = node_id;

    while let Some(node) = graph.get(current) {
        if !visited.insert(current) {
            tracing::warn!(node = current, "cycle detected while resolving path");
            break;
        }
        path.push(node.id.clone());

        let parents: Vec<&NodeId> = node
            .parent_ids
            .iter()
            .filter(|p| graph.contains(p.as_str()))
            .collect();
        let Some(first) = parents.first() else {
            break;
        };
        current = match parents.iter().find(|p| hinted.contains(p.as_str())) {
            Some(p) => p.as_str(),
            None => {
                if parents.len() > 1 {
                    tracing::debug!(
                        error = %EngineError::AmbiguousPath(node.id.clone()),
                        "falling back to first parent"
                    );
                }
                first.as_str()
            }
        };
    }

    path.reverse();
    path
}

/// True when `path` starts at a root and every step follows a parent link.
pub fn is_valid_path(graph: &Graph, path: &[NodeId]) -> bool {
    let Some(first) = path.first() else {
        return true;
    };
    let root_ok = graph
        .get(first)
        .is_some_and(|n| n.parent_ids.iter().all(|p| !graph.contains(p)));
    root_ok
        && path.windows(2).all(|pair| {
            graph
                .get(&pair[1])
                .is_some_and(|n| n.parent_ids.contains(&pair[0]))
        })
}

/// Index of `id` within `path`.
pub fn position(path: &[NodeId], id: &str) -> Option<usize> {
    path.iter().position(|p| p == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;

    fn diamond() -> Graph {
        let mut graph = Graph::new();
        graph.insert(Node::human("r").with_id("r"));
        graph.insert(Node::human("x").with_id("x").with_parent("r"));
        graph.insert(Node::human("y").with_id("y").with_parent("r"));
        graph.insert(
            Node::human("m")
                .with_id("m")
                .with_parent("x")
                .with_parent("y"),
        );
        graph.insert(Node::human("t").with_id("t").with_parent("m"));
        graph
    }

    #[test]
    fn test_resolve_linear() {
        let graph = diamond();
        assert_eq!(resolve_path(&graph, "x", &[]), vec!["r", "x"]);
        assert_eq!(resolve_path(&graph, "r", &[]), vec!["r"]);
    }

    #[test]
    fn test_resolve_convergence_defaults_to_first_parent() {
        let graph = diamond();
        assert_eq!(resolve_path(&graph, "t", &[]), vec!["r", "x", "m", "t"]);
    }

    #[test]
    fn test_resolve_convergence_follows_hint() {
        let graph = diamond();
        let hint: Vec<NodeId> = vec!["r".into(), "y".into(), "m".into()];
        assert_eq!(resolve_path(&graph, "t", &hint), vec!["r", "y", "m", "t"]);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let graph = diamond();
        let hint: Vec<NodeId> = vec!["y".into()];
        let a = resolve_path(&graph, "t", &hint);
        let b = resolve_path(&graph, "t", &hint);
        assert_eq!(a, b);
    }

    #[test]
    fn test_resolve_skips_dangling_parent() {
        let mut nodes = indexmap::IndexMap::new();
        nodes.insert("r".to_string(), Node::human("r").with_id("r"));
        nodes.insert(
            "o".to_string(),
            Node::human("o")
                .with_id("o")
                .with_parent("gone")
                .with_parent("r"),
        );
        let graph = Graph::from_nodes(nodes);
        assert_eq!(resolve_path(&graph, "o", &[]), vec!["r", "o"]);
    }

    #[test]
    fn test_resolve_terminates_on_cycle() {
        let mut graph = Graph::new();
        graph.insert(Node::human("a").with_id("a"));
        graph.insert(Node::human("b").with_id("b").with_parent("a"));
        graph.get_mut("a").unwrap().parent_ids.push("b".into());
        let path = resolve_path(&graph, "b", &[]);
        assert_eq!(path, vec!["a", "b"]);
    }

    #[test]
    fn test_is_valid_path() {
        let graph = diamond();
        let ok: Vec<NodeId> = vec!["r".into(), "y".into(), "m".into()];
        let bad: Vec<NodeId> = vec!["r".into(), "m".into()];
        let headless: Vec<NodeId> = vec!["x".into(), "m".into()];
        assert!(is_valid_path(&graph, &ok));
        assert!(!is_valid_path(&graph, &bad));
        assert!(!is_valid_path(&graph, &headless));
        assert!(is_valid_path(&graph, &[]));
    }
}
