use anyhow::{Result, bail};
use std::path::Path;
use textloom::v1::{Graph, NodeId, NodeStatus, TreeDocument};

use crate::session;

pub fn run(file: &Path) -> Result<()> {
    let document = session::read_document(file)?;
    let problems = check(&document);
    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("  {problem}");
        }
        bail!("{} needs repair ({} problems)", file.display(), problems.len());
    }
    println!("{} is valid ({} nodes)", file.display(), document.nodes.len());
    Ok(())
}

/// Describe everything loading `document` would repair.
fn check(document: &TreeDocument) -> Vec<String> {
    let mut problems = Vec::new();
    let mut linked = document.nodes.clone();
    for node in linked.values_mut() {
        if node.status == NodeStatus::Loading {
            problems.push(format!("{}: generation never finished", node.id));
        }
        let mut kept: Vec<NodeId> = Vec::with_capacity(node.parent_ids.len());
        for parent in &node.parent_ids {
            if !document.nodes.contains_key(parent) {
                problems.push(format!("{}: unknown parent {parent}", node.id));
            } else if parent == &node.id {
                problems.push(format!("{}: is its own parent", node.id));
            } else if kept.contains(parent) {
                problems.push(format!("{}: duplicate parent {parent}", node.id));
            } else {
                kept.push(parent.clone());
            }
        }
        node.parent_ids = kept;
    }

    if !Graph::from_nodes(linked).is_acyclic() {
        problems.push("graph contains a cycle".to_string());
    }

    let (_, path) = document.clone().repair();
    if let Some(selected) = &document.selected_path
        && selected != &path
    {
        problems.push("selected path does not resolve".to_string());
    }
    problems
}
