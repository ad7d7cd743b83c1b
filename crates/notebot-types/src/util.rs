//! Utility functions for safe string handling.

/// Truncate `&str` to at most `max_chars` characters, never splitting a UTF-8 codepoint.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_is_unchanged() {
        assert_eq!(truncate_chars("hello", 10), "hello");
    }

    #[test]
    fn exact_boundary() {
        assert_eq!(truncate_chars("hello", 5), "hello");
    }

    #[test]
    fn ascii() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
    }

    #[test]
    fn empty_and_zero() {
        assert_eq!(truncate_chars("", 5), "");
        assert_eq!(truncate_chars("hello", 0), "");
    }

    #[test]
    fn counts_chars_not_bytes() {
        let s = "\u{1F600}\u{1F601}\u{1F602}";
        assert_eq!(truncate_chars(s, 1), "\u{1F600}");
        assert_eq!(truncate_chars(s, 2), "\u{1F600}\u{1F601}");
        assert_eq!(truncate_chars("caf\u{00e9}!", 4), "caf\u{00e9}");
    }
}
