//! Graph mutation: carry out a classified [`Strategy`].
//!
//! Every strategy preserves the flat-text contract: after it runs, the view
//! of the returned path equals the old flat text with the edit applied.
//! Mutators work on whatever graph they are handed; the editor passes a
//! scratch copy so a failure leaves the live graph alone.

use crate::classify::Strategy;
use crate::diff::TextEdit;
use crate::error::{EngineError, Result};
use crate::graph::Graph;
use crate::path::position;
use crate::text::{char_len, insert_at_char, replace_chars, split_at_char};
use crate::types::{Node, NodeId};

/// What a mutation left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Intended selection path; the editor re-resolves it against the graph.
    pub path: Vec<NodeId>,
    /// Flat-text caret after the edit.
    pub cursor: usize,
    /// `(visible, hidden)` when a live split was started.
    pub started: Option<(NodeId, NodeId)>,
}

fn node_mut<'a>(graph: &'a mut Graph, id: &str) -> Result<&'a mut Node> {
    graph
        .get_mut(id)
        .ok_or_else(|| EngineError::InvalidReference(id.to_string()))
}

fn node<'a>(graph: &'a Graph, id: &str) -> Result<&'a Node> {
    graph
        .get(id)
        .ok_or_else(|| EngineError::InvalidReference(id.to_string()))
}

fn path_index(path: &[NodeId], id: &str) -> Result<usize> {
    position(path, id).ok_or_else(|| EngineError::InvalidReference(id.to_string()))
}

/// Cut `id` at `offset`: the node keeps the head, a fragment of the same
/// kind takes the tail and inherits every existing child. Returns the
/// fragment's id.
pub(crate) fn split_off_tail(graph: &mut Graph, id: &str, offset: usize) -> Result<NodeId> {
    let origin = node(graph, id)?;
    let (head, tail) = split_at_char(&origin.text, offset);
    let (head, tail) = (head.to_string(), tail.to_string());
    let fragment = Node::fragment_of(origin, tail).with_parent(id);
    let old_children = graph.children(id);

    node_mut(graph, id)?.text = head;
    let fragment_id = graph.insert(fragment);
    for child in &old_children {
        graph.replace_parent(child, id, std::slice::from_ref(&fragment_id));
    }
    Ok(fragment_id)
}

/// Apply `strategy` for `edit` to `graph`, starting from selection `path`.
pub fn apply(
    graph: &mut Graph,
    path: &[NodeId],
    strategy: &Strategy,
    edit: &TextEdit,
) -> Result<Applied> {
    let cursor = edit.start + edit.inserted_len();
    let mut started = None;

    let next_path = match strategy {
        Strategy::Noop => path.to_vec(),

        Strategy::ClearAll => {
            graph.clear();
            if edit.inserted.is_empty() {
                Vec::new()
            } else {
                vec![graph.insert(Node::human(&edit.inserted))]
            }
        }

        Strategy::NewRoot => vec![graph.insert(Node::human(&edit.inserted))],

        Strategy::NewParentRoot { root } => {
            let new_root = graph.insert(Node::human(&edit.inserted));
            node_mut(graph, root)?.parent_ids = vec![new_root.clone()];
            std::iter::once(new_root).chain(path.iter().cloned()).collect()
        }

        Strategy::Append { node } => {
            node_mut(graph, node)?.text.push_str(&edit.inserted);
            path.to_vec()
        }

        Strategy::Prepend { node } => {
            insert_at_char(&mut node_mut(graph, node)?.text, 0, &edit.inserted);
            path.to_vec()
        }

        Strategy::InsertInto { node, offset } => {
            insert_at_char(&mut node_mut(graph, node)?.text, *offset, &edit.inserted);
            path.to_vec()
        }

        Strategy::NewChild { parent } => {
            let i = path_index(path, parent)?;
            let child = graph.insert(Node::human(&edit.inserted).with_parent(parent));
            let mut next = path[..=i].to_vec();
            next.push(child);
            next
        }

        Strategy::Interpose { right } => {
            let i = path_index(path, right)?;
            let Some(left) = i.checked_sub(1).map(|l| path[l].clone()) else {
                return apply(graph, path, &Strategy::NewParentRoot { root: right.clone() }, edit);
            };
            let human = graph.insert(Node::human(&edit.inserted).with_parent(&left));
            graph.replace_parent(right, &left, std::slice::from_ref(&human));
            let mut next = path.to_vec();
            next.insert(i, human);
            next
        }

        Strategy::Split { node: id, offset } => {
            let i = path_index(path, id)?;
            let old_children = graph.children(id);
            let origin = node(graph, id)?;
            let (head, tail) = split_at_char(&origin.text, *offset);
            let (head, tail) = (head.to_string(), tail.to_string());
            let continuation = Node::fragment_of(origin, tail);

            node_mut(graph, id)?.text = head;
            let human = graph.insert(Node::human(&edit.inserted).with_parent(id));
            let continuation = graph.insert(continuation.with_parent(&human));
            for child in &old_children {
                graph.replace_parent(child, id, std::slice::from_ref(&continuation));
            }

            let mut next = path[..=i].to_vec();
            next.push(human);
            next.push(continuation);
            next.extend_from_slice(&path[i + 1..]);
            next
        }

        Strategy::LiveSplit { node: id, cut } => {
            let i = path_index(path, id)?;
            let mut next = path.to_vec();
            if let Some(cut) = cut {
                let tail = split_off_tail(graph, id, *cut)?;
                next.insert(i + 1, tail);
            }

            let visible = node_mut(graph, id)?;
            let Some(ch) = visible.text.pop() else {
                return Err(EngineError::InvalidOffset {
                    node: id.clone(),
                    offset: 0,
                    len: 0,
                });
            };
            let hidden = Node::fragment_of(visible, ch.to_string()).with_parent(id);
            let hidden = graph.insert(hidden);
            started = Some((id.clone(), hidden));
            next
        }

        Strategy::LiveSplitContinue { visible, hidden } => {
            let Some(ch) = node_mut(graph, visible)?.text.pop() else {
                return Err(EngineError::InvalidOffset {
                    node: visible.clone(),
                    offset: 0,
                    len: 0,
                });
            };
            insert_at_char(&mut node_mut(graph, hidden)?.text, 0, &ch.to_string());
            path.to_vec()
        }

        Strategy::Destructive { node: id } => destroy(graph, path, id)?,

        Strategy::Recombine {
            bridge,
            parent,
            continuation,
        } => {
            let tail = node(graph, continuation)?.text.clone();
            node_mut(graph, parent)?.text.push_str(&tail);
            graph.reparent_children(continuation, std::slice::from_ref(parent));
            graph.remove(bridge);
            graph.remove(continuation);
            path.iter()
                .filter(|p| *p != bridge && *p != continuation)
                .cloned()
                .collect()
        }

        Strategy::DeleteIn { node: id, offset } => {
            replace_chars(&mut node_mut(graph, id)?.text, *offset, edit.removed_len(), "");
            path.to_vec()
        }

        Strategy::ReplaceIn { node: id, offset } => {
            replace_chars(
                &mut node_mut(graph, id)?.text,
                *offset,
                edit.removed_len(),
                &edit.inserted,
            );
            path.to_vec()
        }

        Strategy::Branch {
            first,
            first_offset,
            last,
            last_offset,
        } => branch(graph, path, first, *first_offset, last, *last_offset, &edit.inserted)?,
    };

    Ok(Applied {
        path: next_path,
        cursor,
        started,
    })
}

/// Remove `id` outright. A non-root hands its parents to its children; a
/// root promotes one child to root and hangs the other children under it.
fn destroy(graph: &mut Graph, path: &[NodeId], id: &str) -> Result<Vec<NodeId>> {
    let doomed = node(graph, id)?;
    let parents: Vec<NodeId> = doomed
        .parent_ids
        .iter()
        .filter(|p| graph.contains(p))
        .cloned()
        .collect();
    let children = graph.children(id);

    if !parents.is_empty() {
        for child in &children {
            graph.replace_parent(child, id, &parents);
        }
    } else if !children.is_empty() {
        let on_path = position(path, id)
            .and_then(|i| path.get(i + 1))
            .filter(|next| children.contains(next));
        let promoted = on_path.unwrap_or(&children[0]).clone();
        node_mut(graph, &promoted)?.parent_ids.clear();
        for child in children.iter().filter(|c| **c != promoted) {
            graph.replace_parent(child, id, std::slice::from_ref(&promoted));
        }
        tracing::debug!(node = id, promoted = %promoted, "promoted child to root");
    } else {
        graph.clear();
        return Ok(Vec::new());
    }

    graph.remove(id);
    Ok(path.iter().filter(|p| *p != id).cloned().collect())
}

/// Preserve removed text as a hidden branch and route the visible path
/// around it.
///
/// The removed range runs from `a` in `first` to `z` in `last`. Text before
/// it stays on the branch point; the replacement text (if any) becomes a new
/// Human node under the branch point; text after it reaches the visible path
/// through a convergence node with the hidden branch as its second parent.
fn branch(
    graph: &mut Graph,
    path: &[NodeId],
    first: &str,
    a: usize,
    last: &str,
    z: usize,
    replacement: &str,
) -> Result<Vec<NodeId>> {
    let ia = path_index(path, first)?;
    let iz = path_index(path, last)?;
    let mut last: NodeId = last.to_string();
    let mut z = z;
    let mut next: Vec<NodeId>;

    let branch_point: NodeId = if a > 0 {
        let rest = split_off_tail(graph, first, a)?;
        if ia == iz {
            last = rest;
            z -= a;
        }
        next = path[..=ia].to_vec();
        first.to_string()
    } else if let Some(pred) = ia.checked_sub(1) {
        next = path[..ia].to_vec();
        path[pred].clone()
    } else {
        let anchor = graph.insert(Node::human(""));
        node_mut(graph, first)?.parent_ids = vec![anchor.clone()];
        next = vec![anchor.clone()];
        anchor
    };

    let visible_end = if replacement.is_empty() {
        branch_point.clone()
    } else {
        let human = graph.insert(Node::human(replacement).with_parent(&branch_point));
        next.push(human.clone());
        human
    };

    let last_len = char_len(&node(graph, &last)?.text);
    let converge = [visible_end, last.clone()];
    if z < last_len {
        let old_children = graph.children(&last);
        let origin = node(graph, &last)?;
        let (head, tail) = split_at_char(&origin.text, z);
        let (head, tail) = (head.to_string(), tail.to_string());
        let continuation = Node::fragment_of(origin, tail).with_parents(converge.clone());

        node_mut(graph, &last)?.text = head;
        let continuation = graph.insert(continuation);
        for child in &old_children {
            graph.replace_parent(child, &last, std::slice::from_ref(&continuation));
        }
        next.push(continuation);
    } else {
        for child in graph.children(&last) {
            graph.replace_parent(&child, &last, &converge);
        }
    }

    next.extend_from_slice(&path[iz + 1..]);
    Ok(next)
}
