use super::headings::HeadingTable;
use super::normalize::normalize_whitespace;
use super::{CanonicalSection, SectionMap};

/// One heading occurrence in the raw text (byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingMatch {
    pub section: CanonicalSection,
    pub start: usize,
    pub end: usize,
}

/// Every occurrence of every heading, sorted by start offset.
///
/// Ties keep table order.
pub fn locate_headings(text: &str, table: &HeadingTable) -> Vec<HeadingMatch> {
    let mut matches: Vec<HeadingMatch> = table
        .patterns()
        .iter()
        .flat_map(|pattern| {
            pattern.regex.find_iter(text).map(move |m| HeadingMatch {
                section: pattern.section,
                start: m.start(),
                end: m.end(),
            })
        })
        .collect();

    matches.sort_by_key(|m| m.start);
    matches
}

/// Slice raw text into sections.
///
/// Each heading's text runs from the end of the heading to the start of the
/// next heading in document order (or end of text), whitespace-normalized.
/// When a heading occurs more than once, the later occurrence overwrites the
/// earlier one: only the last-positioned slice is kept for that section.
/// A running header or table of contents that repeats a heading therefore
/// replaces the body text.
pub fn segment(text: &str, table: &HeadingTable) -> SectionMap {
    let headings = locate_headings(text, table);
    let mut sections = SectionMap::new();

    if headings.is_empty() {
        tracing::warn!(text_length = text.len(), "No section headings found in text");
        return sections;
    }

    tracing::info!(headings = headings.len(), "Found section headings");

    for (i, heading) in headings.iter().enumerate() {
        let bound = headings
            .get(i + 1)
            .map_or(text.len(), |next| next.start)
            .max(heading.end);

        tracing::debug!(
            section = heading.section.as_str(),
            start = heading.start,
            end = bound,
            "Heading slice"
        );

        let body = text.get(heading.end..bound).unwrap_or_default();
        sections.set(heading.section, normalize_whitespace(body));
    }

    tracing::info!(sections = sections.filled_count(), "Parsed proposal sections");
    sections
}
