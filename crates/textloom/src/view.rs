//! The linear view: one resolved path projected into flat text.

use serde::Serialize;

use crate::graph::Graph;
use crate::text::char_len;
use crate::types::{GenerationMeta, NodeId, NodeKind, NodeStatus};

/// The span of flat text contributed by one node on the path.
/// Offsets are code points; `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub node_id: NodeId,
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub kind: NodeKind,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationMeta>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `offset` falls strictly between the segment's ends.
    pub fn strictly_contains(&self, offset: usize) -> bool {
        self.start < offset && offset < self.end
    }
}

/// Segments plus their concatenation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinearView {
    segments: Vec<Segment>,
    text: String,
    len: usize,
}

impl LinearView {
    /// Project `path` through `graph`. Loading placeholders and ids missing
    /// from the store contribute nothing.
    pub fn build(graph: &Graph, path: &[NodeId]) -> Self {
        let mut segments = Vec::with_capacity(path.len());
        let mut text = String::new();
        let mut offset = 0;

        for node in path.iter().filter_map(|id| graph.get(id)) {
            if node.is_loading() {
                continue;
            }
            let len = char_len(&node.text);
            segments.push(Segment {
                node_id: node.id.clone(),
                start: offset,
                end: offset + len,
                text: node.text.clone(),
                kind: node.kind,
                status: node.status.clone(),
                generation: node.generation.clone(),
            });
            text.push_str(&node.text);
            offset += len;
        }

        Self {
            segments,
            text,
            len: offset,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the flat text in code points.
    pub fn char_len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, node_id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.node_id == node_id)
    }

    /// The segment an offset falls strictly inside of.
    pub fn segment_strictly_containing(&self, offset: usize) -> Option<&Segment> {
        self.segments.iter().find(|s| s.strictly_contains(offset))
    }

    /// Non-empty segments overlapping `[start, end)`, in path order.
    pub fn touched(&self, start: usize, end: usize) -> Vec<&Segment> {
        self.segments
            .iter()
            .filter(|s| !s.is_empty() && s.start < end && s.end > start)
            .collect()
    }

    /// The non-empty segments meeting at `offset`: the one ending there and
    /// the one starting there.
    pub fn boundary(&self, offset: usize) -> (Option<&Segment>, Option<&Segment>) {
        let left = self
            .segments
            .iter()
            .rev()
            .find(|s| !s.is_empty() && s.end == offset);
        let right = self
            .segments
            .iter()
            .find(|s| !s.is_empty() && s.start == offset);
        (left, right)
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }
}

/// Concatenate segment texts back into flat text.
pub fn concatenate(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}
