//! Folding generation results back into the graph.
//!
//! The engine side is synchronous: [`Editor::begin_generation`] plants
//! loading placeholders and hands back the requests, an async driver streams
//! completions, and each [`GenerationEvent`] is applied with
//! [`Editor::apply_generation_event`]. Once every request of a batch has
//! finished, empty, failed and refused results are pruned.

use indexmap::{IndexMap, IndexSet};

use crate::editor::Editor;
use crate::error::{EngineError, Result};
use crate::text::normalize_newlines;
use crate::types::{GenerationMeta, Node, NodeId, NodeStatus};

pub type BatchId = u64;

/// Status reason given to requests that were cancelled.
pub const CANCELLED: &str = "cancelled";

/// One completion to stream into placeholder `node_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub batch: BatchId,
    pub node_id: NodeId,
    pub prompt: String,
    pub params: GenerationMeta,
}

/// The requests fanned out by one "generate" action.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationBatch {
    pub id: BatchId,
    /// The node the placeholders hang off.
    pub parent: NodeId,
    pub requests: Vec<GenerationRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    /// The full completion text.
    Completed(String),
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    /// Text streamed since the previous progress event.
    Progress { node_id: NodeId, delta: String },
    Finished {
        node_id: NodeId,
        result: GenerationResult,
    },
}

impl GenerationEvent {
    pub fn node_id(&self) -> &str {
        match self {
            GenerationEvent::Progress { node_id, .. } | GenerationEvent::Finished { node_id, .. } => {
                node_id
            }
        }
    }
}

/// Outcome of a settled batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub batch: BatchId,
    pub kept: Vec<NodeId>,
    pub pruned: Vec<NodeId>,
    /// The first failure reason seen in the batch, reported once.
    pub first_error: Option<String>,
}

impl BatchReport {
    pub fn error(&self) -> Option<EngineError> {
        self.first_error
            .clone()
            .map(EngineError::GenerationFailure)
    }
}

/// Does `text` open with one of the refusal `markers` (case-insensitive)?
pub fn is_refusal(text: &str, markers: &[String]) -> bool {
    let opening = text.trim_start().to_lowercase();
    markers
        .iter()
        .any(|m| !m.is_empty() && opening.starts_with(&m.to_lowercase()))
}

#[derive(Debug, Clone, Default)]
struct BatchState {
    members: Vec<NodeId>,
    pending: IndexSet<NodeId>,
    first_error: Option<String>,
}

/// Batches whose requests have not all finished.
#[derive(Debug, Clone, Default)]
pub(crate) struct Batches {
    next_id: BatchId,
    active: IndexMap<BatchId, BatchState>,
}

impl Batches {
    fn open(&mut self, members: Vec<NodeId>) -> BatchId {
        self.next_id += 1;
        let id = self.next_id;
        self.active.insert(
            id,
            BatchState {
                pending: members.iter().cloned().collect(),
                members,
                first_error: None,
            },
        );
        id
    }

    fn batch_of(&self, node: &str) -> Option<BatchId> {
        self.active
            .iter()
            .find(|(_, state)| state.pending.contains(node))
            .map(|(id, _)| *id)
    }

    pub(crate) fn is_in_flight(&self, node: &str) -> bool {
        self.batch_of(node).is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.active.clear();
    }
}

impl Editor {
    /// Plant `count` loading placeholders under the focus and return the
    /// requests to stream into them. The prompt is the current flat text.
    pub fn begin_generation(&mut self, params: GenerationMeta, count: usize) -> Result<GenerationBatch> {
        let Some(parent) = self.path.last().cloned() else {
            return Err(EngineError::GenerationFailure(
                "nothing selected to continue from".to_string(),
            ));
        };
        if self.graph.get(&parent).is_some_and(Node::is_loading) {
            return Err(EngineError::Pinned(parent));
        }

        self.checkpoint();
        let prompt = self.view.text().to_string();
        let members: Vec<NodeId> = (0..count.max(1))
            .map(|_| {
                self.graph
                    .insert(Node::placeholder(params.clone()).with_parent(&parent))
            })
            .collect();
        let id = self.batches.open(members.clone());
        tracing::info!(batch = id, parent = %parent, requests = members.len(), "generation started");
        self.notify();

        Ok(GenerationBatch {
            id,
            parent,
            requests: members
                .into_iter()
                .map(|node_id| GenerationRequest {
                    batch: id,
                    node_id,
                    prompt: prompt.clone(),
                    params: params.clone(),
                })
                .collect(),
        })
    }

    /// Ids of batches still waiting on requests.
    pub fn active_batches(&self) -> Vec<BatchId> {
        self.batches.active.keys().copied().collect()
    }

    /// Apply one streamed event. Returns the batch report once the event
    /// settles its batch. Events for unknown nodes are ignored.
    pub fn apply_generation_event(&mut self, event: GenerationEvent) -> Option<BatchReport> {
        let Some(batch) = self.batches.batch_of(event.node_id()) else {
            tracing::debug!(
                error = %EngineError::InvalidReference(event.node_id().to_string()),
                "ignoring generation event"
            );
            return None;
        };

        match event {
            GenerationEvent::Progress { node_id, delta } => {
                if let Some(node) = self.graph.get_mut(&node_id)
                    && node.is_loading()
                {
                    node.text.push_str(&normalize_newlines(&delta));
                }
                None
            }
            GenerationEvent::Finished { node_id, result } => {
                let state = self.batches.active.get_mut(&batch)?;
                state.pending.shift_remove(&node_id);
                let status = match result {
                    GenerationResult::Completed(text) => {
                        if let Some(node) = self.graph.get_mut(&node_id) {
                            node.text = normalize_newlines(&text);
                        }
                        NodeStatus::Ready
                    }
                    GenerationResult::Failed(reason) => {
                        state.first_error.get_or_insert_with(|| reason.clone());
                        NodeStatus::Failed(reason)
                    }
                    GenerationResult::Cancelled => NodeStatus::Failed(CANCELLED.to_string()),
                };
                if let Some(node) = self.graph.get_mut(&node_id) {
                    node.status = status;
                }

                let settled = state.pending.is_empty();
                let report = settled.then(|| self.settle(batch));
                let path = self.path.clone();
                self.reselect(&path);
                self.notify();
                report
            }
        }
    }

    /// Cancel every outstanding request of `batch`: pending placeholders
    /// are deleted and finished ones are settled as usual.
    pub fn cancel_generation(&mut self, batch: BatchId) -> Option<BatchReport> {
        let state = self.batches.active.get_mut(&batch)?;
        let pending: Vec<NodeId> = state.pending.drain(..).collect();
        state.members.retain(|m| !pending.contains(m));
        for id in &pending {
            if !self.graph.has_children(id) {
                self.graph.remove(id);
            }
        }
        tracing::info!(batch, cancelled = pending.len(), "generation cancelled");

        let mut report = self.settle(batch);
        report.pruned.extend(pending);
        let path = self.path.clone();
        self.reselect(&path);
        self.notify();
        Some(report)
    }

    /// Close `batch`, pruning members that produced nothing usable.
    fn settle(&mut self, batch: BatchId) -> BatchReport {
        let Some(state) = self.batches.active.shift_remove(&batch) else {
            return BatchReport {
                batch,
                ..Default::default()
            };
        };

        let mut report = BatchReport {
            batch,
            first_error: state.first_error,
            ..Default::default()
        };
        for id in state.members {
            let Some(node) = self.graph.get(&id) else {
                continue;
            };
            let unusable = matches!(node.status, NodeStatus::Failed(_))
                || node.text.trim().is_empty()
                || is_refusal(&node.text, &self.config.refusal_markers);
            if unusable && !self.graph.has_children(&id) {
                self.graph.remove(&id);
                report.pruned.push(id);
            } else {
                report.kept.push(id);
            }
        }
        tracing::info!(
            batch,
            kept = report.kept.len(),
            pruned = report.pruned.len(),
            "generation settled"
        );
        if let Some(reason) = &report.first_error {
            tracing::warn!(batch, reason = %reason, "generation failed");
        }
        report
    }
}
