//! Code-point helpers for node text.
//!
//! All offsets in the engine are counted in Unicode scalar values, never in
//! bytes. These helpers translate between the two.

/// Collapse `\r\n` and lone `\r` into `\n`.
pub fn normalize_newlines(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Number of code points in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the code point at `char_idx` (clamped to the end).
pub fn byte_offset(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Split at a code-point offset.
pub fn split_at_char(text: &str, char_idx: usize) -> (&str, &str) {
    text.split_at(byte_offset(text, char_idx))
}

/// The code points in `[start, end)`.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let from = byte_offset(text, start);
    let to = byte_offset(text, end.max(start));
    &text[from..to]
}

/// Insert `insert` at a code-point offset.
pub fn insert_at_char(text: &mut String, char_idx: usize, insert: &str) {
    let at = byte_offset(text, char_idx);
    text.insert_str(at, insert);
}

/// Replace the code points in `[start, start + len)` with `with`.
pub fn replace_chars(text: &mut String, start: usize, len: usize, with: &str) {
    let from = byte_offset(text, start);
    let to = byte_offset(text, start + len);
    text.replace_range(from..to, with);
}
