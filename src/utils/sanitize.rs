//! Utilities for normalizing and truncating extracted text.
//!
//! Bodies and diagnostics pulled out of bounce messages are stored in reports
//! and embedded in prompts; these helpers keep them single-line, free of
//! control characters and bounded in size.

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex - this is a bug"));

/// Collapses every run of whitespace (including line breaks) into one space
/// and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

/// Truncates `text` to at most `max_chars` characters.
///
/// Counts characters, not bytes, so multi-byte text is never split inside a
/// code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Normalizes whitespace, then truncates to `max_chars` characters.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    truncate_chars(&normalize_whitespace(text), max_chars)
}

/// Removes control characters other than tab, newline and carriage return.
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}
