//! Diff engine: recover a single edit from two versions of the flat text.
//!
//! Prefix/suffix trimming finds *an* edit, but when the typed or deleted
//! character equals its neighbour the trimmed boundaries are off by the
//! run length. The caller's selection or cursor pins the edit to where it
//! actually happened.

use crate::text::{char_len, char_slice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    None,
    Insert,
    Delete,
    Replace,
}

/// How removed text was taken out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Backspace: the caret sat after the removed text.
    Backward,
    /// Delete key: the caret sat before the removed text.
    Forward,
    /// A selected range was cut or overwritten.
    Selection,
}

/// One edit against the flat text, in code-point offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub kind: EditKind,
    pub start: usize,
    pub removed: String,
    pub inserted: String,
    pub removal: Removal,
}

impl TextEdit {
    pub fn none() -> Self {
        Self {
            kind: EditKind::None,
            start: 0,
            removed: String::new(),
            inserted: String::new(),
            removal: Removal::Selection,
        }
    }

    pub fn insert(start: usize, text: impl Into<String>) -> Self {
        Self::from_parts(start, String::new(), text.into(), Removal::Selection)
    }

    /// A single-character backspace removing `removed` at `start`.
    pub fn backspace(start: usize, removed: impl Into<String>) -> Self {
        Self::from_parts(start, removed.into(), String::new(), Removal::Backward)
    }

    pub fn delete(start: usize, removed: impl Into<String>) -> Self {
        Self::from_parts(start, removed.into(), String::new(), Removal::Selection)
    }

    pub fn replace(start: usize, removed: impl Into<String>, inserted: impl Into<String>) -> Self {
        Self::from_parts(start, removed.into(), inserted.into(), Removal::Selection)
    }

    fn from_parts(start: usize, removed: String, inserted: String, removal: Removal) -> Self {
        let kind = match (removed.is_empty(), inserted.is_empty()) {
            (true, true) => EditKind::None,
            (true, false) => EditKind::Insert,
            (false, true) => EditKind::Delete,
            (false, false) => EditKind::Replace,
        };
        Self {
            kind,
            start,
            removed,
            inserted,
            removal,
        }
    }

    pub fn removed_len(&self) -> usize {
        char_len(&self.removed)
    }

    pub fn inserted_len(&self) -> usize {
        char_len(&self.inserted)
    }

    /// Exclusive end of the removed range in the old text.
    pub fn end(&self) -> usize {
        self.start + self.removed_len()
    }

    /// A one-character deletion made with backspace.
    pub fn is_backspace(&self) -> bool {
        self.kind == EditKind::Delete
            && self.removal == Removal::Backward
            && self.removed_len() == 1
    }
}

/// A selection in flat-text offsets. `anchor == head` is a bare caret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn caret(at: usize) -> Self {
        Self {
            anchor: at,
            head: at,
        }
    }

    pub fn range(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }
}

/// What the editing surface knew when the edit happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditContext {
    /// Selection captured before the edit was applied to the surface.
    pub before: Option<Selection>,
    /// Caret position after the edit.
    pub cursor_after: Option<usize>,
}

impl EditContext {
    pub fn with_selection(selection: Selection) -> Self {
        Self {
            before: Some(selection),
            cursor_after: None,
        }
    }

    pub fn with_cursor_after(cursor: usize) -> Self {
        Self {
            before: None,
            cursor_after: Some(cursor),
        }
    }
}

/// Compute the edit that turns `old` into `new`.
///
/// # Examples
///
/// ```
/// use textloom::v1::{compute_edit, EditContext, EditKind, Selection};
///
/// // Typing a second "o" after the "f" of "foo": trimming alone says offset 3.
/// let edit = compute_edit("foo", "fooo", &EditContext::with_selection(Selection::caret(1)));
/// assert_eq!(edit.kind, EditKind::Insert);
/// assert_eq!(edit.start, 1);
/// assert_eq!(edit.inserted, "o");
/// ```
pub fn compute_edit(old: &str, new: &str, ctx: &EditContext) -> TextEdit {
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let prefix = old_chars
        .iter()
        .zip(&new_chars)
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old_chars.len().min(new_chars.len()) - prefix;
    let suffix = old_chars
        .iter()
        .rev()
        .zip(new_chars.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let trimmed_start = prefix;
    let trimmed_removed = old_chars.len() - prefix - suffix;
    if trimmed_removed == 0 && new_chars.len() == old_chars.len() {
        return TextEdit::none();
    }

    let (start, removed_len, removal) = snap(&old_chars, &new_chars, ctx)
        .unwrap_or_else(|| {
            let removal = if trimmed_removed == 1 {
                Removal::Backward
            } else {
                Removal::Selection
            };
            (trimmed_start, trimmed_removed, removal)
        });

    let inserted_len = new_chars.len() + removed_len - old_chars.len();
    TextEdit::from_parts(
        start,
        char_slice(old, start, start + removed_len).to_string(),
        char_slice(new, start, start + inserted_len).to_string(),
        removal,
    )
}

/// Try the placements the caller's coordinates suggest, in order.
fn snap(old: &[char], new: &[char], ctx: &EditContext) -> Option<(usize, usize, Removal)> {
    let grown = new.len() as isize - old.len() as isize;
    let mut candidates: Vec<(usize, usize, Removal)> = Vec::new();

    if let Some(sel) = ctx.before {
        if !sel.is_collapsed() {
            candidates.push((sel.from(), sel.to() - sel.from(), Removal::Selection));
        } else if grown > 0 {
            candidates.push((sel.head, 0, Removal::Selection));
        } else if grown < 0 {
            let k = grown.unsigned_abs();
            if let Some(back) = sel.head.checked_sub(k) {
                candidates.push((back, k, Removal::Backward));
            }
            candidates.push((sel.head, k, Removal::Forward));
        }
    }
    if let Some(after) = ctx.cursor_after
        && grown > 0
        && let Some(start) = after.checked_sub(grown as usize)
    {
        candidates.push((start, 0, Removal::Selection));
    }

    candidates
        .into_iter()
        .find(|&(start, removed, _)| fits(old, new, start, removed))
}

/// Does `new == old[..start] + X + old[start + removed..]` for some `X`?
fn fits(old: &[char], new: &[char], start: usize, removed: usize) -> bool {
    let end = start + removed;
    if end > old.len() || start > new.len() {
        return false;
    }
    let kept_tail = old.len() - end;
    if start + kept_tail > new.len() {
        return false;
    }
    old[..start] == new[..start] && old[end..] == new[new.len() - kept_tail..]
}
