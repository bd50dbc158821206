use anyhow::{Context, Result};
use similar::TextDiff;
use std::path::Path;
use textloom::v1::{ChangeKind, EditContext, Selection};

use crate::{modify, session};

pub fn context(anchor: Option<usize>, head: Option<usize>, cursor: Option<usize>) -> EditContext {
    EditContext {
        before: anchor.map(|a| Selection::range(a, head.unwrap_or(a))),
        cursor_after: cursor,
    }
}

pub fn run(file: &Path, ctx: EditContext, show_diff: bool) -> Result<()> {
    let new_text = session::read_stdin()?;
    let (old_text, outcome) = modify(file, |editor| {
        let old = editor.flat_text().to_string();
        let outcome = editor
            .apply_text(&new_text, &ctx)
            .context("edit refused")?;
        Ok((old, outcome))
    })?;

    if show_diff && let Some(diff) = compute_diff(&old_text, &new_text) {
        print!("{diff}");
    }
    println!(
        "{} {} cursor={}",
        outcome.strategy.name(),
        change_name(outcome.change),
        outcome.cursor
    );
    Ok(())
}

fn change_name(change: ChangeKind) -> &'static str {
    match change {
        ChangeKind::None => "none",
        ChangeKind::InPlace => "in-place",
        ChangeKind::Structural => "structural",
    }
}

fn compute_diff(old: &str, new: &str) -> Option<String> {
    let diff = TextDiff::from_lines(old, new);
    let unified = diff
        .unified_diff()
        .context_radius(3)
        .header("before", "after")
        .to_string();
    if unified.is_empty() {
        None
    } else {
        Some(unified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_caret_only() {
        let ctx = context(Some(3), None, None);
        assert_eq!(ctx.before, Some(Selection::caret(3)));
        assert_eq!(ctx.cursor_after, None);
    }

    #[test]
    fn test_context_range_and_cursor() {
        let ctx = context(Some(5), Some(2), Some(4));
        assert_eq!(ctx.before, Some(Selection::range(5, 2)));
        assert_eq!(ctx.cursor_after, Some(4));
    }

    #[test]
    fn test_context_empty() {
        assert_eq!(context(None, None, None), EditContext::default());
    }

    #[test]
    fn test_compute_diff_identical() {
        assert!(compute_diff("same", "same").is_none());
    }

    #[test]
    fn test_compute_diff_changed() {
        let diff = compute_diff("The cat sat", "The cat lay").unwrap();
        assert!(diff.contains("--- before"));
        assert!(diff.contains("+++ after"));
    }

    #[test]
    fn test_change_names() {
        assert_eq!(change_name(ChangeKind::InPlace), "in-place");
        assert_eq!(change_name(ChangeKind::Structural), "structural");
    }
}
