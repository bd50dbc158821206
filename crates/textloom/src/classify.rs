//! Edit classification: which graph mutation does a flat-text edit imply?
//!
//! Classification is pure. It reads the edit, the current view, local
//! topology and the live-split mode, and names a [`Strategy`]; the mutator
//! carries it out.

use crate::diff::{EditKind, TextEdit};
use crate::graph::Graph;
use crate::livesplit::LiveSplit;
use crate::path::position;
use crate::types::{NodeId, NodeKind};
use crate::view::{LinearView, Segment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Noop,
    /// Removal covered the whole flat text: drop every node.
    ClearAll,
    /// Nothing selected: the typed text becomes a new root.
    NewRoot,
    /// Typing before an AI root: a new Human root above it.
    NewParentRoot { root: NodeId },
    Append { node: NodeId },
    Prepend { node: NodeId },
    InsertInto { node: NodeId, offset: usize },
    /// Typing after a node whose children must keep their context.
    NewChild { parent: NodeId },
    /// Typing between two AI nodes: a Human node goes in between.
    Interpose { right: NodeId },
    /// Typing inside an AI node.
    Split { node: NodeId, offset: usize },
    /// Backspace against generated text; `cut` first splits the node there.
    LiveSplit { node: NodeId, cut: Option<usize> },
    LiveSplitContinue { visible: NodeId, hidden: NodeId },
    Destructive { node: NodeId },
    Recombine {
        bridge: NodeId,
        parent: NodeId,
        continuation: NodeId,
    },
    DeleteIn { node: NodeId, offset: usize },
    ReplaceIn { node: NodeId, offset: usize },
    /// Removal preserved as a hidden branch. Offsets are within `first`
    /// (inclusive start) and `last` (exclusive end).
    Branch {
        first: NodeId,
        first_offset: usize,
        last: NodeId,
        last_offset: usize,
    },
}

impl Strategy {
    /// Does this strategy change node count, kinds or edges?
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Strategy::Noop
                | Strategy::Append { .. }
                | Strategy::Prepend { .. }
                | Strategy::InsertInto { .. }
                | Strategy::DeleteIn { .. }
                | Strategy::ReplaceIn { .. }
                | Strategy::LiveSplitContinue { .. }
        )
    }

    /// Existing nodes whose text or edges the strategy rewrites.
    pub fn targets(&self, path: &[NodeId]) -> Vec<NodeId> {
        match self {
            Strategy::Noop | Strategy::NewRoot | Strategy::NewChild { .. } => Vec::new(),
            Strategy::ClearAll => path.to_vec(),
            Strategy::NewParentRoot { root } => vec![root.clone()],
            Strategy::Append { node }
            | Strategy::Prepend { node }
            | Strategy::InsertInto { node, .. }
            | Strategy::Split { node, .. }
            | Strategy::LiveSplit { node, .. }
            | Strategy::Destructive { node }
            | Strategy::DeleteIn { node, .. }
            | Strategy::ReplaceIn { node, .. } => vec![node.clone()],
            Strategy::Interpose { right } => vec![right.clone()],
            Strategy::LiveSplitContinue { visible, hidden } => {
                vec![visible.clone(), hidden.clone()]
            }
            Strategy::Recombine {
                bridge,
                parent,
                continuation,
            } => vec![bridge.clone(), parent.clone(), continuation.clone()],
            Strategy::Branch { first, last, .. } => {
                match (position(path, first), position(path, last)) {
                    (Some(a), Some(z)) if a <= z => path[a..=z].to_vec(),
                    _ => vec![first.clone(), last.clone()],
                }
            }
        }
    }

    /// Short lowercase name, used in logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Noop => "noop",
            Strategy::ClearAll => "clear-all",
            Strategy::NewRoot => "new-root",
            Strategy::NewParentRoot { .. } => "new-parent-root",
            Strategy::Append { .. } => "append",
            Strategy::Prepend { .. } => "prepend",
            Strategy::InsertInto { .. } => "insert",
            Strategy::NewChild { .. } => "new-child",
            Strategy::Interpose { .. } => "interpose",
            Strategy::Split { .. } => "split",
            Strategy::LiveSplit { .. } => "live-split",
            Strategy::LiveSplitContinue { .. } => "live-split-continue",
            Strategy::Destructive { .. } => "destructive",
            Strategy::Recombine { .. } => "recombine",
            Strategy::DeleteIn { .. } => "delete",
            Strategy::ReplaceIn { .. } => "replace",
            Strategy::Branch { .. } => "branch",
        }
    }
}

/// Pick the strategy for `edit` against the current `view` of `path`.
pub fn classify(
    edit: &TextEdit,
    view: &LinearView,
    graph: &Graph,
    path: &[NodeId],
    mode: &LiveSplit,
) -> Strategy {
    match edit.kind {
        EditKind::None => Strategy::Noop,
        _ if edit.removed_len() > 0
            && edit.start == 0
            && edit.removed_len() == view.char_len() =>
        {
            Strategy::ClearAll
        }
        EditKind::Insert => classify_insert(edit.start, view, graph),
        EditKind::Delete | EditKind::Replace => classify_removal(edit, view, graph, path, mode),
    }
}

fn classify_insert(offset: usize, view: &LinearView, graph: &Graph) -> Strategy {
    let (Some(first), Some(last)) = (view.first(), view.last()) else {
        return Strategy::NewRoot;
    };

    if let Some(seg) = view.segment_strictly_containing(offset) {
        let node = seg.node_id.clone();
        let offset = offset - seg.start;
        return match seg.kind {
            NodeKind::Human => Strategy::InsertInto { node, offset },
            NodeKind::Ai => Strategy::Split { node, offset },
        };
    }

    if offset >= view.char_len() {
        return match last.kind {
            NodeKind::Human if !graph.has_children(&last.node_id) => Strategy::Append {
                node: last.node_id.clone(),
            },
            _ => Strategy::NewChild {
                parent: last.node_id.clone(),
            },
        };
    }

    if offset == 0 {
        return match first.kind {
            NodeKind::Human => Strategy::Prepend {
                node: first.node_id.clone(),
            },
            NodeKind::Ai => Strategy::NewParentRoot {
                root: first.node_id.clone(),
            },
        };
    }

    match view.boundary(offset) {
        (Some(left), Some(right)) => match (left.kind, right.kind) {
            (NodeKind::Human, NodeKind::Ai) => Strategy::Append {
                node: left.node_id.clone(),
            },
            (NodeKind::Ai, NodeKind::Human) | (NodeKind::Human, NodeKind::Human) => {
                Strategy::Prepend {
                    node: right.node_id.clone(),
                }
            }
            (NodeKind::Ai, NodeKind::Ai) => Strategy::Interpose {
                right: right.node_id.clone(),
            },
        },
        _ => Strategy::NewChild {
            parent: last.node_id.clone(),
        },
    }
}

fn classify_removal(
    edit: &TextEdit,
    view: &LinearView,
    graph: &Graph,
    path: &[NodeId],
    mode: &LiveSplit,
) -> Strategy {
    let start = edit.start;
    let end = edit.end();
    match view.touched(start, end).as_slice() {
        [] => Strategy::Noop,
        [seg] => classify_single(edit, seg, graph, path, mode),
        [first, .., last] => Strategy::Branch {
            first: first.node_id.clone(),
            first_offset: start - first.start,
            last: last.node_id.clone(),
            last_offset: end - last.start,
        },
    }
}

fn classify_single(
    edit: &TextEdit,
    seg: &Segment,
    graph: &Graph,
    path: &[NodeId],
    mode: &LiveSplit,
) -> Strategy {
    let node = seg.node_id.clone();
    let offset = edit.start - seg.start;
    let len = edit.removed_len();
    let node_len = seg.len();
    let exact = offset == 0 && len == node_len;
    let is_delete = edit.kind == EditKind::Delete;

    if is_delete
        && exact
        && let Some((parent, continuation)) = recombination(graph, path, &node)
    {
        return Strategy::Recombine {
            bridge: node,
            parent,
            continuation,
        };
    }

    if edit.is_backspace() {
        let at_end = offset + 1 == node_len;
        let live = |node: NodeId| match mode.hidden_for(&node) {
            Some(hidden) if graph.contains(hidden) => Strategy::LiveSplitContinue {
                visible: node,
                hidden: hidden.clone(),
            },
            _ => Strategy::LiveSplit { node, cut: None },
        };
        return match seg.kind {
            NodeKind::Ai if at_end => live(node),
            NodeKind::Ai => Strategy::LiveSplit {
                node,
                cut: Some(offset + 1),
            },
            NodeKind::Human if node_len == 1 => Strategy::Destructive { node },
            NodeKind::Human if at_end && graph.has_children(&node) => live(node),
            NodeKind::Human => Strategy::DeleteIn { node, offset },
        };
    }

    let has_parent = position(path, &node).is_some_and(|i| i > 0);
    let whole = Strategy::Branch {
        first: node.clone(),
        first_offset: 0,
        last: node.clone(),
        last_offset: node_len,
    };
    match (seg.kind, exact) {
        (_, true) if has_parent => whole,
        (NodeKind::Ai, true) => whole,
        (NodeKind::Human, true) if is_delete => Strategy::Destructive { node },
        (NodeKind::Human, _) if is_delete => Strategy::DeleteIn { node, offset },
        (NodeKind::Human, _) => Strategy::ReplaceIn { node, offset },
        (NodeKind::Ai, false) => Strategy::Branch {
            first: node.clone(),
            first_offset: offset,
            last: node,
            last_offset: offset + len,
        },
    }
}

/// If `bridge` is the Human node left behind by a split of an AI node,
/// return `(origin, continuation)`.
///
/// The continuation must be the bridge's only child, carry
/// `split_from = origin`, have the bridge as its only parent, and follow the
/// bridge on the selection path.
pub fn recombination(graph: &Graph, path: &[NodeId], bridge: &str) -> Option<(NodeId, NodeId)> {
    let node = graph.get(bridge)?;
    if node.kind != NodeKind::Human || node.parent_ids.len() != 1 {
        return None;
    }
    let origin = graph.get(&node.parent_ids[0])?;
    if origin.kind != NodeKind::Ai {
        return None;
    }
    let children = graph.children(bridge);
    let [continuation] = children.as_slice() else {
        return None;
    };
    let cont = graph.get(continuation)?;
    let eligible = cont.kind == NodeKind::Ai
        && cont.split_from.as_deref() == Some(origin.id.as_str())
        && cont.parent_ids.len() == 1;
    let i = position(path, bridge)?;
    let follows = path.get(i + 1).is_some_and(|next| next == continuation);
    (eligible && follows).then(|| (origin.id.clone(), continuation.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationMeta, Node};

    /// root(Human "The cat") -> ai(Ai " sat on") -> tail(Human " the mat")
    fn fixture() -> (Graph, Vec<NodeId>) {
        let mut graph = Graph::new();
        graph.insert(Node::human("The cat").with_id("root"));
        graph.insert(
            Node::ai(" sat on", GenerationMeta::new("m"))
                .with_id("ai")
                .with_parent("root"),
        );
        graph.insert(Node::human(" the mat").with_id("tail").with_parent("ai"));
        (graph, vec!["root".into(), "ai".into(), "tail".into()])
    }

    fn run(graph: &Graph, path: &[NodeId], edit: TextEdit) -> Strategy {
        let view = LinearView::build(graph, path);
        classify(&edit, &view, graph, path, &LiveSplit::Idle)
    }

    #[test]
    fn test_noop_and_clear_all() {
        let (graph, path) = fixture();
        assert_eq!(run(&graph, &path, TextEdit::none()), Strategy::Noop);
        let all = "The cat sat on the mat";
        assert_eq!(
            run(&graph, &path, TextEdit::replace(0, all, "hello")),
            Strategy::ClearAll
        );
        assert_eq!(run(&graph, &path, TextEdit::delete(0, all)), Strategy::ClearAll);
    }

    #[test]
    fn test_insert_without_selection() {
        let graph = Graph::new();
        assert_eq!(run(&graph, &[], TextEdit::insert(0, "hi")), Strategy::NewRoot);
    }

    #[test]
    fn test_insert_inside_nodes() {
        let (graph, path) = fixture();
        assert_eq!(
            run(&graph, &path, TextEdit::insert(3, "X")),
            Strategy::InsertInto {
                node: "root".into(),
                offset: 3
            }
        );
        assert_eq!(
            run(&graph, &path, TextEdit::insert(10, "X")),
            Strategy::Split {
                node: "ai".into(),
                offset: 3
            }
        );
    }

    #[test]
    fn test_insert_at_kind_boundaries() {
        let (graph, path) = fixture();
        // Human | AI: goes into the Human node on the left.
        assert_eq!(
            run(&graph, &path, TextEdit::insert(7, "X")),
            Strategy::Append {
                node: "root".into()
            }
        );
        // AI | Human: goes into the Human node on the right.
        assert_eq!(
            run(&graph, &path, TextEdit::insert(14, "X")),
            Strategy::Prepend {
                node: "tail".into()
            }
        );
    }

    #[test]
    fn test_insert_between_two_ai_nodes() {
        let mut graph = Graph::new();
        graph.insert(Node::ai("ab", GenerationMeta::new("m")).with_id("a"));
        graph.insert(
            Node::ai("cd", GenerationMeta::new("m"))
                .with_id("b")
                .with_parent("a"),
        );
        let path = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            run(&graph, &path, TextEdit::insert(2, "X")),
            Strategy::Interpose { right: "b".into() }
        );
        assert_eq!(
            run(&graph, &path, TextEdit::insert(0, "X")),
            Strategy::NewParentRoot { root: "a".into() }
        );
        assert_eq!(
            run(&graph, &path, TextEdit::insert(4, "X")),
            Strategy::NewChild { parent: "b".into() }
        );
    }

    #[test]
    fn test_insert_at_end_of_human() {
        let (mut graph, path) = fixture();
        assert_eq!(
            run(&graph, &path, TextEdit::insert(22, "!")),
            Strategy::Append {
                node: "tail".into()
            }
        );
        graph.insert(Node::human(" again").with_id("kid").with_parent("tail"));
        assert_eq!(
            run(&graph, &path, TextEdit::insert(22, "!")),
            Strategy::NewChild {
                parent: "tail".into()
            }
        );
    }

    #[test]
    fn test_backspace_on_ai() {
        let (graph, path) = fixture();
        let short: Vec<NodeId> = path[..2].to_vec();
        assert_eq!(
            run(&graph, &short, TextEdit::backspace(13, "n")),
            Strategy::LiveSplit {
                node: "ai".into(),
                cut: None
            }
        );
        assert_eq!(
            run(&graph, &short, TextEdit::backspace(9, "a")),
            Strategy::LiveSplit {
                node: "ai".into(),
                cut: Some(3)
            }
        );
    }

    #[test]
    fn test_backspace_continues_active_live_split() {
        let (mut graph, path) = fixture();
        let short: Vec<NodeId> = path[..2].to_vec();
        graph.insert(Node::human("n").with_id("hidden").with_parent("ai"));
        let view = LinearView::build(&graph, &short);
        let mode = LiveSplit::Active {
            visible: "ai".into(),
            hidden: "hidden".into(),
        };
        let strategy = classify(&TextEdit::backspace(13, "n"), &view, &graph, &short, &mode);
        assert_eq!(
            strategy,
            Strategy::LiveSplitContinue {
                visible: "ai".into(),
                hidden: "hidden".into()
            }
        );
    }

    #[test]
    fn test_backspace_on_human() {
        let (mut graph, path) = fixture();
        // Human leaf: plain in-place delete.
        assert_eq!(
            run(&graph, &path, TextEdit::backspace(21, "t")),
            Strategy::DeleteIn {
                node: "tail".into(),
                offset: 7
            }
        );
        // Human with children, last char: live split.
        assert_eq!(
            run(&graph, &path[..1], TextEdit::backspace(6, "t")),
            Strategy::LiveSplit {
                node: "root".into(),
                cut: None
            }
        );
        // Human with children emptied: destructive.
        graph.get_mut("root").unwrap().text = "T".into();
        assert_eq!(
            run(&graph, &path[..2], TextEdit::backspace(0, "T")),
            Strategy::Destructive {
                node: "root".into()
            }
        );
    }

    #[test]
    fn test_selection_removals() {
        let (graph, path) = fixture();
        // Spanning two nodes.
        assert_eq!(
            run(&graph, &path, TextEdit::delete(5, "at sat")),
            Strategy::Branch {
                first: "root".into(),
                first_offset: 5,
                last: "ai".into(),
                last_offset: 4
            }
        );
        // Exact AI node with a parent.
        assert_eq!(
            run(&graph, &path, TextEdit::delete(7, " sat on")),
            Strategy::Branch {
                first: "ai".into(),
                first_offset: 0,
                last: "ai".into(),
                last_offset: 7
            }
        );
        // Partial Human: in place.
        assert_eq!(
            run(&graph, &path, TextEdit::replace(0, "The", "A")),
            Strategy::ReplaceIn {
                node: "root".into(),
                offset: 0
            }
        );
        // Partial AI: branch.
        assert_eq!(
            run(&graph, &path, TextEdit::delete(8, "sat")),
            Strategy::Branch {
                first: "ai".into(),
                first_offset: 1,
                last: "ai".into(),
                last_offset: 4
            }
        );
    }

    #[test]
    fn test_exact_delete_of_human_leaf_keeps_text_on_branch() {
        let (graph, path) = fixture();
        assert_eq!(
            run(&graph, &path, TextEdit::delete(14, " the mat")),
            Strategy::Branch {
                first: "tail".into(),
                first_offset: 0,
                last: "tail".into(),
                last_offset: 8
            }
        );
        assert!(matches!(
            run(&graph, &path, TextEdit::replace(14, " the mat", " a rug")),
            Strategy::Branch { .. }
        ));
    }

    #[test]
    fn test_exact_selection_of_parentless_human() {
        let (graph, path) = fixture();
        assert_eq!(
            run(&graph, &path, TextEdit::delete(0, "The cat")),
            Strategy::Destructive {
                node: "root".into()
            }
        );
        assert_eq!(
            run(&graph, &path, TextEdit::replace(0, "The cat", "A dog")),
            Strategy::ReplaceIn {
                node: "root".into(),
                offset: 0
            }
        );
    }

    #[test]
    fn test_recombination_preferred() {
        let mut graph = Graph::new();
        graph.insert(Node::ai("abc", GenerationMeta::new("m")).with_id("origin"));
        graph.insert(Node::human("X").with_id("bridge").with_parent("origin"));
        graph.insert(
            Node::ai("def", GenerationMeta::new("m"))
                .with_id("cont")
                .with_parent("bridge")
                .with_split_from("origin"),
        );
        let path: Vec<NodeId> = vec!["origin".into(), "bridge".into(), "cont".into()];
        assert_eq!(
            run(&graph, &path, TextEdit::backspace(3, "X")),
            Strategy::Recombine {
                bridge: "bridge".into(),
                parent: "origin".into(),
                continuation: "cont".into()
            }
        );
        // Not on the path: no recombination.
        assert!(recombination(&graph, &path[..2], "bridge").is_none());
    }

    #[test]
    fn test_structural_flags_and_targets() {
        let path: Vec<NodeId> = vec!["a".into(), "b".into(), "c".into()];
        assert!(!Strategy::Append { node: "a".into() }.is_structural());
        assert!(Strategy::Split {
            node: "a".into(),
            offset: 1
        }
        .is_structural());
        let branch = Strategy::Branch {
            first: "a".into(),
            first_offset: 1,
            last: "c".into(),
            last_offset: 1,
        };
        assert_eq!(branch.targets(&path), path);
        assert!(Strategy::NewChild { parent: "c".into() }.targets(&path).is_empty());
        assert_eq!(branch.name(), "branch");
    }
}
