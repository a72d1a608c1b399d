/// Collapse every whitespace run to a single space and trim both ends.
pub fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Character count (Unicode scalar values), the unit of every length rule.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
