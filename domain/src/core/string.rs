//! String utilities for the domain layer.

/// Cut `s` to at most `max_bytes` without splitting a UTF-8 character.
pub fn truncate_at_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Shorten text for log output, marking the cut with an ellipsis.
pub fn preview(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        s.to_string()
    } else {
        format!("{}...", truncate_at_boundary(s, max_bytes))
    }
}
