#![doc = include_str!("../README.md")]

mod classify;
mod diff;
mod document;
mod editor;
mod error;
mod generation;
mod graph;
mod history;
mod livesplit;
mod mutate;
mod ops;
mod path;
mod text;
mod types;
mod view;

pub mod v1 {
    //! Versioned public API for the text-DAG engine.
    //!
    //! # Data model
    //!
    //! - [`Node`]: a fragment of text, human-written or generated
    //! - [`Graph`]: the node arena; edges are parent ids
    //! - [`LinearView`] / [`Segment`]: one path projected to flat text
    //!
    //! # Editing
    //!
    //! - [`Editor`]: owns a graph and a selection path; every change goes
    //!   through it
    //! - [`TextEdit`] / [`compute_edit`]: flat-text edits and how to derive
    //!   them from two strings
    //! - [`Strategy`]: the graph mutation an edit was classified as
    //!
    //! # Generation
    //!
    //! - [`Editor::begin_generation`] plants placeholders and returns a
    //!   [`GenerationBatch`]; results come back as [`GenerationEvent`]s
    //!
    //! # Example: edit through the flat text
    //!
    //! ```
    //! use textloom::v1::*;
    //!
    //! let mut editor = Editor::default();
    //! editor.apply_text("The cat", &EditContext::default()).unwrap();
    //! let root = editor.focus().cloned().unwrap();
    //! editor.add_child(&root, " sat on the mat.", NodeKind::Ai).unwrap();
    //!
    //! // Typing inside generated text splits it around a new human node.
    //! let outcome = editor
    //!     .apply_text("The cat sat quietly on the mat.", &EditContext::default())
    //!     .unwrap();
    //! assert!(matches!(outcome.strategy, Strategy::Split { .. }));
    //! assert_eq!(editor.flat_text(), "The cat sat quietly on the mat.");
    //! assert_eq!(editor.graph().len(), 4);
    //! ```

    pub use crate::classify::{Strategy, classify, recombination};
    pub use crate::diff::{EditContext, EditKind, Removal, Selection, TextEdit, compute_edit};
    pub use crate::document::{INTERRUPTED, TreeDocument};
    pub use crate::editor::{ChangeKind, EditOutcome, Editor, EngineConfig};
    pub use crate::error::{EngineError, Result};
    pub use crate::generation::{
        BatchId, BatchReport, CANCELLED, GenerationBatch, GenerationEvent, GenerationRequest,
        GenerationResult, is_refusal,
    };
    pub use crate::graph::Graph;
    pub use crate::livesplit::{LiveSplit, ModeEvent};
    pub use crate::mutate::{Applied, apply};
    pub use crate::path::{is_valid_path, position, resolve_path};
    pub use crate::text::{char_len, normalize_newlines};
    pub use crate::types::{GenerationMeta, Node, NodeId, NodeKind, NodeStatus, new_node_id};
    pub use crate::view::{LinearView, Segment, concatenate};
}
