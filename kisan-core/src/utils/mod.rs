//! Utility functions and helpers

/// Truncate a string to at most `max_chars` characters, never splitting a
/// code point. Devanagari text makes byte-based truncation unsafe here.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Turn free text into a compact session title.
///
/// Whitespace runs collapse to `_`, URL-hostile characters are dropped and
/// the result is capped at `max_chars`. Returns `None` when nothing usable
/// is left.
pub fn slug_title(text: &str, max_chars: usize) -> Option<String> {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;

    for c in text.chars() {
        if c.is_whitespace() || c == '_' {
            pending_sep = !slug.is_empty();
            continue;
        }
        if matches!(c, '/' | '\\' | '?' | '#' | '%' | '&' | '"' | '\'') || c.is_control() {
            continue;
        }
        if pending_sep {
            slug.push('_');
            pending_sep = false;
        }
        slug.push(c);
    }

    let slug = truncate_chars(&slug, max_chars).trim_end_matches('_');
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}
