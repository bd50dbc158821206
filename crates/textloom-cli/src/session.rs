use anyhow::{Context, Result};
use std::io::{self, Read};
use std::path::Path;
use textloom::v1::{Editor, EngineConfig, TreeDocument};

/// Open a tree document. Damage the engine can repair (dangling parents,
/// cycles, interrupted generations) is repaired silently.
pub fn load(path: &Path) -> Result<Editor> {
    let document = read_document(path)?;
    Ok(Editor::from_document(document, EngineConfig::default()))
}

pub fn read_document(path: &Path) -> Result<TreeDocument> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document: {}", path.display()))?;
    TreeDocument::from_json(&data)
        .with_context(|| format!("failed to parse document: {}", path.display()))
}

/// Write the editor's state, replacing `path` atomically.
pub fn save(path: &Path, editor: &Editor) -> Result<()> {
    let document = editor.to_document();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir)
        .context("failed to create temp file for atomic write")?;
    serde_json::to_writer_pretty(&tmp, &document).context("failed to serialize document")?;
    tmp.persist(path)
        .with_context(|| format!("failed to persist document: {}", path.display()))?;
    tracing::debug!(path = %path.display(), nodes = document.nodes.len(), "document saved");
    Ok(())
}

pub fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}
