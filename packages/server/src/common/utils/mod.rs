pub mod content_hash;

pub use content_hash::*;

/// Truncate a string to at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate a string for logging purposes.
pub fn truncate_for_log(s: &str, max_chars: usize) -> String {
    let head = truncate_chars(s, max_chars);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{}...[truncated]", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_chars_respects_multibyte() {
        assert_eq!(truncate_chars("açúcar", 3), "açú");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn truncate_for_log_marks_cut() {
        assert_eq!(truncate_for_log("abcdef", 3), "abc...[truncated]");
        assert_eq!(truncate_for_log("abc", 3), "abc");
    }
}
