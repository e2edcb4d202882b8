//! UTF-8-safe truncation helpers.
//!
//! Shell output, file previews and renderer lines are capped by size. Slicing
//! bytes directly panics when the cut lands inside a multi-byte character.

/// Return a UTF-8-safe prefix whose byte length is at most `max_bytes`.
pub fn safe_prefix_by_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }

    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Truncate by bytes and append `suffix` when truncation occurs.
pub fn truncate_with_suffix_by_bytes(text: &str, max_bytes: usize, suffix: &str) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let prefix = safe_prefix_by_bytes(text, max_bytes);
    format!("{prefix}{suffix}")
}

/// First line of `text`, cut to `max_chars` characters with an ellipsis.
pub fn one_line_preview(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    let more_lines = text.lines().nth(1).is_some();
    if line.chars().count() <= max_chars {
        return if more_lines {
            format!("{line}…")
        } else {
            line.to_string()
        };
    }
    let prefix: String = line.chars().take(max_chars).collect();
    format!("{prefix}…")
}
