use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use textloom::v1::{Editor, Node, NodeKind};

use crate::cmd_show::{kind_label, status_label};
use crate::{modify, session};

pub fn run(file: &Path, json: bool) -> Result<()> {
    let editor = session::load(file)?;
    if json {
        let nodes: Vec<&Node> = editor.graph().iter().collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&nodes).context("failed to serialize nodes")?
        );
        return Ok(());
    }
    for line in listing(&editor) {
        println!("{line}");
    }
    Ok(())
}

/// One line per node. `*` marks the selected path, `-` nodes off it.
fn listing(editor: &Editor) -> Vec<String> {
    let on_path: HashSet<&str> = editor.path().iter().map(String::as_str).collect();
    editor
        .graph()
        .iter()
        .map(|node| {
            let marker = if on_path.contains(node.id.as_str()) {
                '*'
            } else {
                '-'
            };
            let parents = if node.parent_ids.is_empty() {
                "root".to_string()
            } else {
                format!("<- {}", node.parent_ids.join(", "))
            };
            format!(
                "{marker} {} {} {} {parents} {:?}",
                node.id,
                kind_label(node.kind),
                status_label(&node.status),
                node.text
            )
        })
        .collect()
}

pub fn add(file: &Path, parent: Option<String>, text: &str, ai: bool) -> Result<()> {
    let kind = if ai { NodeKind::Ai } else { NodeKind::Human };
    let id = modify(file, |editor| {
        let parent = match parent {
            Some(parent) => parent,
            None => editor
                .focus()
                .cloned()
                .context("document is empty; nothing to attach to")?,
        };
        Ok(editor.add_child(&parent, text, kind)?)
    })?;
    println!("{id}");
    Ok(())
}

pub fn delete(file: &Path, node: &str) -> Result<()> {
    let removed = modify(file, |editor| Ok(editor.delete_subtree(node)?))?;
    for id in removed {
        println!("{id}");
    }
    Ok(())
}

pub fn split(file: &Path, node: &str, offset: usize) -> Result<()> {
    let tail = modify(file, |editor| Ok(editor.split_node(node, offset)?))?;
    println!("{tail}");
    Ok(())
}

pub fn merge(file: &Path, node: &str) -> Result<()> {
    let merged = modify(file, |editor| Ok(editor.merge_into_parent(node)?))?;
    println!("{merged}");
    Ok(())
}
