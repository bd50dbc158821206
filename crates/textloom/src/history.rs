//! Snapshot undo/redo.

use std::collections::VecDeque;

use crate::document::TreeDocument;

/// Bounded undo and redo stacks of whole-state snapshots.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<TreeDocument>,
    redo: VecDeque<TreeDocument>,
    depth: usize,
}

impl History {
    pub fn new(depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            depth: depth.max(1),
        }
    }

    /// Record the state as it was before a new action. Clears redo.
    pub fn record(&mut self, snapshot: TreeDocument) {
        self.redo.clear();
        if self.undo.back() == Some(&snapshot) {
            return;
        }
        self.undo.push_back(snapshot);
        Self::trim(&mut self.undo, self.depth);
    }

    /// Step back: `current` goes onto the redo stack, the previous state is
    /// returned.
    pub fn undo(&mut self, current: TreeDocument) -> Option<TreeDocument> {
        let previous = self.undo.pop_back()?;
        self.redo.push_back(current);
        Self::trim(&mut self.redo, self.depth);
        Some(previous)
    }

    pub fn redo(&mut self, current: TreeDocument) -> Option<TreeDocument> {
        let next = self.redo.pop_back()?;
        self.undo.push_back(current);
        Self::trim(&mut self.undo, self.depth);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    fn trim(stack: &mut VecDeque<TreeDocument>, depth: usize) {
        while stack.len() > depth {
            stack.pop_front();
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(selected: &str) -> TreeDocument {
        TreeDocument {
            selected_node_id: Some(selected.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_undo_redo_symmetry() {
        let mut history = History::new(10);
        history.record(doc("a"));
        assert!(history.can_undo());
        assert!(!history.can_redo());

        let previous = history.undo(doc("b")).unwrap();
        assert_eq!(previous, doc("a"));
        let next = history.redo(doc("a")).unwrap();
        assert_eq!(next, doc("b"));
        assert!(history.redo(doc("b")).is_none());
    }

    #[test]
    fn test_duplicate_snapshots_are_skipped() {
        let mut history = History::new(10);
        history.record(doc("a"));
        history.record(doc("a"));
        assert!(history.undo(doc("b")).is_some());
        assert!(history.undo(doc("a")).is_none());
    }

    #[test]
    fn test_new_action_clears_redo() {
        let mut history = History::new(10);
        history.record(doc("a"));
        history.undo(doc("b"));
        assert!(history.can_redo());
        history.record(doc("a"));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_depth_drops_oldest() {
        let mut history = History::new(2);
        for id in ["a", "b", "c"] {
            history.record(doc(id));
        }
        assert_eq!(history.undo(doc("d")), Some(doc("c")));
        assert_eq!(history.undo(doc("c")), Some(doc("b")));
        assert_eq!(history.undo(doc("b")), None);
    }
}
