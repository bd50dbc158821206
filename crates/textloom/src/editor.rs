//! The editor: one graph, one selection path, one flat-text surface.
//!
//! Every user-visible change flows through [`Editor`]. Flat-text edits are
//! classified into a [`Strategy`], applied to a scratch copy of the graph,
//! and committed only when the whole mutation succeeded.

use crate::classify::{Strategy, classify};
use crate::diff::{EditContext, TextEdit, compute_edit};
use crate::document::{INTERRUPTED, TreeDocument};
use crate::error::{EngineError, Result};
use crate::generation::Batches;
use crate::graph::Graph;
use crate::history::History;
use crate::livesplit::{LiveSplit, ModeEvent};
use crate::mutate;
use crate::path::resolve_path;
use crate::text::{char_slice, normalize_newlines};
use crate::types::{NodeId, NodeStatus};
use crate::view::{LinearView, Segment};

/// Engine tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum number of undo snapshots kept.
    pub history_depth: usize,
    /// Case-insensitive prefixes that mark a completion as a refusal.
    pub refusal_markers: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_depth: 100,
            refusal_markers: ["I'm sorry", "I cannot", "I can't", "As an AI"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl EngineConfig {
    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    pub fn with_refusal_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.refusal_markers = markers.into_iter().map(Into::into).collect();
        self
    }
}

/// How far an edit reached into the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    None,
    /// Only node text changed.
    InPlace,
    /// Nodes or edges were added, removed or rewired.
    Structural,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub strategy: Strategy,
    pub change: ChangeKind,
    /// Flat-text offset to put the caret at.
    pub cursor: usize,
}

type Listener = Box<dyn FnMut(&LinearView) + Send>;

pub struct Editor {
    pub(crate) graph: Graph,
    pub(crate) path: Vec<NodeId>,
    pub(crate) view: LinearView,
    pub(crate) live_split: LiveSplit,
    pub(crate) history: History,
    pub(crate) batches: Batches,
    pub(crate) config: EngineConfig,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("graph", &self.graph)
            .field("path", &self.path)
            .field("live_split", &self.live_split)
            .field("batches", &self.batches)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Editor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            graph: Graph::new(),
            path: Vec::new(),
            view: LinearView::default(),
            live_split: LiveSplit::Idle,
            history: History::new(config.history_depth),
            batches: Batches::default(),
            config,
            listeners: Vec::new(),
        }
    }

    /// Open a document without recording an undo step.
    pub fn from_document(document: TreeDocument, config: EngineConfig) -> Self {
        let mut editor = Self::new(config);
        let (graph, path) = document.repair();
        editor.graph = graph;
        editor.reselect(&path);
        editor
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    /// The selected node: the last node on the path.
    pub fn focus(&self) -> Option<&NodeId> {
        self.path.last()
    }

    pub fn view(&self) -> &LinearView {
        &self.view
    }

    pub fn segments(&self) -> &[Segment] {
        self.view.segments()
    }

    pub fn flat_text(&self) -> &str {
        self.view.text()
    }

    pub fn live_split(&self) -> &LiveSplit {
        &self.live_split
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a callback fired with the new view after every structural
    /// change.
    pub fn on_structural_change(&mut self, listener: impl FnMut(&LinearView) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ── flat-text editing ────────────────────────────────────────────────

    /// Diff the current flat text against `new_text` and apply the result.
    pub fn apply_text(&mut self, new_text: &str, ctx: &EditContext) -> Result<EditOutcome> {
        let new_text = normalize_newlines(new_text);
        let edit = compute_edit(self.view.text(), &new_text, ctx);
        self.apply_edit(&edit)
    }

    /// Apply one edit expressed in flat-text coordinates.
    pub fn apply_edit(&mut self, edit: &TextEdit) -> Result<EditOutcome> {
        let len = self.view.char_len();
        if edit.start > len
            || edit.end() > len
            || char_slice(self.view.text(), edit.start, edit.end()) != edit.removed
        {
            return Err(EngineError::StaleEdit { start: edit.start });
        }

        let strategy = classify(edit, &self.view, &self.graph, &self.path, &self.live_split);
        tracing::debug!(strategy = strategy.name(), start = edit.start, "classified edit");
        if strategy == Strategy::Noop {
            return Ok(EditOutcome {
                strategy,
                change: ChangeKind::None,
                cursor: edit.start,
            });
        }
        self.check_pins(&strategy)?;

        let mut scratch = self.graph.clone();
        let applied = mutate::apply(&mut scratch, &self.path, &strategy, edit)?;

        self.checkpoint();
        self.graph = scratch;
        let event = match (&strategy, applied.started) {
            (_, Some((visible, hidden))) => ModeEvent::Started { visible, hidden },
            (Strategy::LiveSplitContinue { .. }, None) => ModeEvent::Continued,
            _ => ModeEvent::Edited,
        };
        self.transition(event);
        self.reselect(&applied.path);

        let change = if strategy.is_structural() {
            self.notify();
            ChangeKind::Structural
        } else {
            ChangeKind::InPlace
        };
        Ok(EditOutcome {
            strategy,
            change,
            cursor: applied.cursor,
        })
    }

    /// Refuse strategies that rewrite text or edges of a node an in-flight
    /// generation depends on.
    fn check_pins(&mut self, strategy: &Strategy) -> Result<()> {
        let pinned = self.graph.pinned();
        if pinned.is_empty() {
            return Ok(());
        }
        let blocked = match strategy {
            Strategy::ClearAll => self
                .path
                .iter()
                .find(|id| pinned.contains(*id))
                .or_else(|| pinned.iter().next())
                .cloned(),
            _ => strategy
                .targets(&self.path)
                .into_iter()
                .find(|id| pinned.contains(id)),
        };
        match blocked {
            Some(node) => {
                tracing::warn!(node = %node, strategy = strategy.name(), "edit refused: node is pinned");
                self.notify();
                Err(EngineError::Pinned(node))
            }
            None => Ok(()),
        }
    }

    // ── history ──────────────────────────────────────────────────────────

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Restore the state before the last action. Returns false when there
    /// is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let current = self.to_document();
        match self.history.undo(current) {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let current = self.to_document();
        match self.history.redo(current) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }

    pub(crate) fn checkpoint(&mut self) {
        let snapshot = self.to_document();
        self.history.record(snapshot);
    }

    fn restore(&mut self, document: TreeDocument) {
        let mut graph = Graph::from_nodes(document.nodes);
        let stale: Vec<NodeId> = graph
            .iter()
            .filter(|n| n.is_loading() && !self.batches.is_in_flight(&n.id))
            .map(|n| n.id.clone())
            .collect();
        for id in stale {
            if let Some(node) = graph.get_mut(&id) {
                node.status = NodeStatus::Failed(INTERRUPTED.to_string());
            }
        }
        self.graph = graph;
        self.transition(ModeEvent::Restored);
        self.reselect(&document.selected_path.unwrap_or_default());
        self.notify();
    }

    // ── persistence ──────────────────────────────────────────────────────

    pub fn to_document(&self) -> TreeDocument {
        TreeDocument::snapshot(&self.graph, &self.path)
    }

    pub fn to_json(&self) -> Result<String> {
        self.to_document().to_json()
    }

    /// Replace the whole graph with a repaired copy of `document`. Undoable.
    pub fn import(&mut self, document: TreeDocument) {
        let (graph, path) = document.repair();
        self.checkpoint();
        self.batches.clear();
        self.graph = graph;
        self.transition(ModeEvent::Restored);
        self.reselect(&path);
        self.notify();
        tracing::debug!(nodes = self.graph.len(), "imported document");
    }

    /// Parse and import a JSON document. A rejected document leaves the
    /// editor untouched.
    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let document = TreeDocument::from_json(json)?;
        self.import(document);
        Ok(())
    }

    // ── internals shared with the other editor modules ───────────────────

    pub(crate) fn transition(&mut self, event: ModeEvent) {
        self.live_split = std::mem::take(&mut self.live_split).next(event);
    }

    /// Re-resolve the selection from an intended path and rebuild the view.
    /// The deepest surviving node of `intended` becomes the focus.
    pub(crate) fn reselect(&mut self, intended: &[NodeId]) {
        let focus = intended
            .iter()
            .rev()
            .find(|id| self.graph.contains(id))
            .cloned()
            .or_else(|| self.graph.roots().into_iter().next());
        self.path = match focus {
            Some(focus) => resolve_path(&self.graph, &focus, intended),
            None => Vec::new(),
        };
        self.view = LinearView::build(&self.graph, &self.path);
    }

    pub(crate) fn notify(&mut self) {
        for listener in &mut self.listeners {
            listener(&self.view);
        }
    }
}
