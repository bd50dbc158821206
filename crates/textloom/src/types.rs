use serde::{Deserialize, Serialize};

use crate::text::normalize_newlines;

/// Opaque node identifier. Freshly created nodes get a UUID v4 string;
/// imported documents may use any string key.
pub type NodeId = String;

// ============================================================================
// Node
// ============================================================================

/// Who authored a node's text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Human,
    Ai,
}

impl NodeKind {
    pub fn is_ai(self) -> bool {
        matches!(self, NodeKind::Ai)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Human => write!(f, "human"),
            NodeKind::Ai => write!(f, "ai"),
        }
    }
}

/// Sampling parameters a generated node was produced with.
///
/// # JSON shape
///
/// ```json
/// { "model": "gpt-4o", "temperature": 0.9, "topP": 1.0, "maxTokens": 128 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMeta {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl GenerationMeta {
    /// Parameters for `model` with neutral sampling defaults.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 1.0,
            top_p: 1.0,
            max_tokens: 256,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Lifecycle state of a node's text.
///
/// `Loading` text is provisional: it is streamed in by a generation request
/// and never shows up in the linear view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Ready,
    Loading,
    Failed(String),
}

/// A fragment of text in the DAG.
///
/// Nodes link to their parents via [`Node::parent_ids`]. A node without
/// parents is a root; a node with more than one parent is a convergence
/// node where two branches share downstream content.
///
/// # Builder API
///
/// ```
/// use textloom::v1::{GenerationMeta, Node};
///
/// let root = Node::human("The cat");
/// let reply = Node::ai(" sat on the mat.", GenerationMeta::new("gpt-4o"))
///     .with_parent(&root.id);
/// assert_eq!(reply.parent_ids, vec![root.id.clone()]);
/// ```
///
/// # JSON shape
///
/// ```json
/// {
///   "id": "6a1f…",
///   "text": " sat on the mat.",
///   "kind": "ai",
///   "parentIds": ["0c2e…"],
///   "generation": { "model": "gpt-4o", "temperature": 1.0, "topP": 1.0, "maxTokens": 256 },
///   "status": { "state": "ready" },
///   "createdAt": "2026-01-29T10:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub id: NodeId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_ids: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationMeta>,
    #[serde(default)]
    pub status: NodeStatus,
    /// The node this one was split off from; marks a recombination candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_from: Option<NodeId>,
    #[serde(default)]
    pub created_at: String,
}

/// A fresh opaque node id.
pub fn new_node_id() -> NodeId {
    uuid::Uuid::new_v4().to_string()
}

fn now_iso8601() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

impl Node {
    /// Create a ready root node with a fresh id and normalized text.
    pub fn new(kind: NodeKind, text: impl AsRef<str>) -> Self {
        Self {
            id: new_node_id(),
            text: normalize_newlines(text.as_ref()),
            kind,
            parent_ids: Vec::new(),
            generation: None,
            status: NodeStatus::Ready,
            split_from: None,
            created_at: now_iso8601(),
        }
    }

    pub fn human(text: impl AsRef<str>) -> Self {
        Self::new(NodeKind::Human, text)
    }

    pub fn ai(text: impl AsRef<str>, generation: GenerationMeta) -> Self {
        Self::new(NodeKind::Ai, text).with_generation(generation)
    }

    /// A loading placeholder for an in-flight generation.
    pub fn placeholder(generation: GenerationMeta) -> Self {
        Self::ai("", generation).with_status(NodeStatus::Loading)
    }

    /// A node of the same kind and provenance as `origin`, holding `text`.
    /// Used for every fragment carved out of an existing node.
    pub fn fragment_of(origin: &Node, text: impl AsRef<str>) -> Self {
        let mut node = Self::new(origin.kind, text);
        node.generation = origin.generation.clone();
        node.split_from = Some(origin.id.clone());
        node
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        self.parent_ids.push(parent.into());
        self
    }

    pub fn with_parents(mut self, parents: impl IntoIterator<Item = NodeId>) -> Self {
        self.parent_ids.extend(parents);
        self
    }

    pub fn with_generation(mut self, generation: GenerationMeta) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_split_from(mut self, origin: impl Into<NodeId>) -> Self {
        self.split_from = Some(origin.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.status == NodeStatus::Loading
    }

    pub fn char_len(&self) -> usize {
        crate::text::char_len(&self.text)
    }
}
