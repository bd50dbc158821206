use thiserror::Error;

use crate::types::NodeId;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the engine. Every operation that returns one of these
/// has left the graph, selection and history untouched.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("node not found: {0}")]
    InvalidReference(NodeId),

    #[error("no parent of {0} is on the selection path")]
    AmbiguousPath(NodeId),

    #[error("node {0} is pinned by an in-flight generation")]
    Pinned(NodeId),

    #[error("generation failed: {0}")]
    GenerationFailure(String),

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("edit does not match the current flat text at offset {start}")]
    StaleEdit { start: usize },

    #[error("offset {offset} is outside node {node} (length {len})")]
    InvalidOffset {
        node: NodeId,
        offset: usize,
        len: usize,
    },

    #[error("node {0} cannot be merged into its parent")]
    NotMergeable(NodeId),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
