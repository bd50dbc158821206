use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use textloom::v1::{NodeKind, NodeStatus, Segment};

use crate::session;

pub fn run(file: &Path, segments: bool, json: bool) -> Result<()> {
    let editor = session::load(file)?;

    if json {
        let out = json!({
            "text": editor.flat_text(),
            "selectedPath": editor.path(),
            "segments": editor.segments(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("failed to serialize view")?
        );
    } else if segments {
        for segment in editor.segments() {
            println!("{}", format_segment(segment));
        }
    } else {
        println!("{}", editor.flat_text());
    }
    Ok(())
}

pub(crate) fn kind_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Human => "human",
        NodeKind::Ai => "ai",
    }
}

pub(crate) fn status_label(status: &NodeStatus) -> String {
    match status {
        NodeStatus::Ready => "ready".to_string(),
        NodeStatus::Loading => "loading".to_string(),
        NodeStatus::Failed(reason) => format!("failed ({reason})"),
    }
}

fn format_segment(segment: &Segment) -> String {
    format!(
        "{:>4}..{:<4} {:<5} {} {:?}",
        segment.start,
        segment.end,
        kind_label(segment.kind),
        segment.node_id,
        segment.text
    )
}
