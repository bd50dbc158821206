//! Explicit structural operations: the node-level counterparts of
//! flat-text editing, used by tree views and scripted callers.

use std::collections::HashSet;

use crate::editor::Editor;
use crate::error::{EngineError, Result};
use crate::livesplit::ModeEvent;
use crate::mutate::split_off_tail;
use crate::path::{position, resolve_path};
use crate::types::{Node, NodeId, NodeKind};

impl Editor {
    fn require(&self, id: &str) -> Result<&Node> {
        self.graph
            .get(id)
            .ok_or_else(|| EngineError::InvalidReference(id.to_string()))
    }

    fn require_unpinned(&self, ids: &[&str]) -> Result<()> {
        let pinned = self.graph.pinned();
        match ids.iter().find(|id| pinned.contains(**id)) {
            Some(id) => {
                tracing::warn!(node = *id, "operation refused: node is pinned");
                Err(EngineError::Pinned(id.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Make `id` the focus. The current path is the hint at convergence
    /// nodes, so re-selecting a node on the path keeps the path.
    pub fn select(&mut self, id: &str) -> Result<()> {
        self.require(id)?;
        let path = resolve_path(&self.graph, id, &self.path);
        self.transition(ModeEvent::SelectionChanged);
        self.reselect(&path);
        self.notify();
        Ok(())
    }

    /// Move the focus to the next (`delta > 0`) or previous sibling, wrapping
    /// around. Siblings of a root are the other roots.
    pub fn select_sibling(&mut self, delta: isize) -> Result<Option<NodeId>> {
        let Some(focus) = self.path.last().cloned() else {
            return Ok(None);
        };
        let siblings = match self.path.len().checked_sub(2).map(|i| &self.path[i]) {
            Some(parent) => self.graph.children(parent),
            None => self.graph.roots(),
        };
        let Some(index) = siblings.iter().position(|s| *s == focus) else {
            return Ok(None);
        };
        let len = siblings.len() as isize;
        let next = siblings[(index as isize + delta).rem_euclid(len) as usize].clone();
        self.select(&next)?;
        Ok(Some(next))
    }

    /// Add a node under `parent` and select it.
    pub fn add_child(&mut self, parent: &str, text: &str, kind: NodeKind) -> Result<NodeId> {
        if self.require(parent)?.is_loading() {
            return Err(EngineError::Pinned(parent.to_string()));
        }
        self.checkpoint();
        let child = self.graph.insert(Node::new(kind, text).with_parent(parent));

        let mut intended = match position(&self.path, parent) {
            Some(i) => self.path[..=i].to_vec(),
            None => resolve_path(&self.graph, parent, &self.path),
        };
        intended.push(child.clone());
        self.transition(ModeEvent::SelectionChanged);
        self.reselect(&intended);
        self.notify();
        Ok(child)
    }

    /// Delete `id` and everything that hangs only off it. A descendant that
    /// also has a parent outside the subtree survives and keeps that parent.
    /// Returns the removed ids.
    pub fn delete_subtree(&mut self, id: &str) -> Result<Vec<NodeId>> {
        self.require(id)?;
        self.require_unpinned(&[id])?;

        let mut doomed: HashSet<NodeId> = HashSet::from([id.to_string()]);
        let below = self.graph.descendants(id);
        loop {
            let before = doomed.len();
            for candidate in &below {
                if doomed.contains(candidate) {
                    continue;
                }
                let orphaned = self.graph.get(candidate).is_some_and(|n| {
                    n.parent_ids
                        .iter()
                        .filter(|p| self.graph.contains(p))
                        .all(|p| doomed.contains(p))
                });
                if orphaned {
                    doomed.insert(candidate.clone());
                }
            }
            if doomed.len() == before {
                break;
            }
        }

        self.checkpoint();
        let removed: Vec<NodeId> = std::iter::once(id.to_string())
            .chain(below.into_iter().filter(|d| doomed.contains(d)))
            .collect();
        for gone in &removed {
            self.graph.remove(gone);
        }
        let survivors: Vec<NodeId> = self
            .graph
            .iter()
            .filter(|n| n.parent_ids.iter().any(|p| doomed.contains(p)))
            .map(|n| n.id.clone())
            .collect();
        for survivor in survivors {
            if let Some(node) = self.graph.get_mut(&survivor) {
                node.parent_ids.retain(|p| !doomed.contains(p));
            }
        }

        let kept: Vec<NodeId> = self
            .path
            .iter()
            .take_while(|p| !doomed.contains(*p))
            .cloned()
            .collect();
        self.transition(ModeEvent::Edited);
        self.reselect(&kept);
        self.notify();
        tracing::debug!(node = id, removed = removed.len(), "deleted subtree");
        Ok(removed)
    }

    /// Cut `id` at a code-point offset. The tail becomes a new node of the
    /// same kind, tagged with `splitFrom`, that takes over the children.
    pub fn split_node(&mut self, id: &str, offset: usize) -> Result<NodeId> {
        let len = self.require(id)?.char_len();
        if offset == 0 || offset >= len {
            return Err(EngineError::InvalidOffset {
                node: id.to_string(),
                offset,
                len,
            });
        }
        self.require_unpinned(&[id])?;

        self.checkpoint();
        let tail = split_off_tail(&mut self.graph, id, offset)?;
        let mut intended = self.path.clone();
        if let Some(i) = position(&intended, id) {
            intended.insert(i + 1, tail.clone());
        }
        self.transition(ModeEvent::Edited);
        self.reselect(&intended);
        self.notify();
        Ok(tail)
    }

    /// Fold `id` into its parent: the parent's text absorbs it and its
    /// children move up. Only a same-kind node with a single parent whose
    /// only child it is can be merged. Returns the parent id.
    pub fn merge_into_parent(&mut self, id: &str) -> Result<NodeId> {
        let node = self.require(id)?;
        let [parent_id] = node.parent_ids.as_slice() else {
            return Err(EngineError::NotMergeable(id.to_string()));
        };
        let parent_id = parent_id.clone();
        let parent = self.require(&parent_id)?;
        if parent.kind != node.kind || self.graph.children(&parent_id).len() != 1 {
            return Err(EngineError::NotMergeable(id.to_string()));
        }
        self.require_unpinned(&[id, parent_id.as_str()])?;

        self.checkpoint();
        let text = self
            .graph
            .get(id)
            .map(|n| n.text.clone())
            .unwrap_or_default();
        if let Some(parent) = self.graph.get_mut(&parent_id) {
            parent.text.push_str(&text);
        }
        self.graph
            .reparent_children(id, std::slice::from_ref(&parent_id));
        self.graph.remove(id);

        let intended: Vec<NodeId> = self.path.iter().filter(|p| *p != id).cloned().collect();
        self.transition(ModeEvent::Edited);
        self.reselect(&intended);
        self.notify();
        Ok(parent_id)
    }
}
