use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use super::CanonicalSection;

/// A compiled heading pattern and the section it opens.
#[derive(Debug, Clone)]
pub struct HeadingPattern {
    pub section: CanonicalSection,
    pub regex: Regex,
}

/// Immutable table of heading patterns, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct HeadingTable {
    patterns: Vec<HeadingPattern>,
}

static PROPOSAL_HEADINGS: LazyLock<HeadingTable> = LazyLock::new(|| HeadingTable {
    patterns: CanonicalSection::ALL
        .iter()
        .map(|section| HeadingPattern {
            section: *section,
            regex: compile(section.heading_pattern()).unwrap(),
        })
        .collect(),
});

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

impl HeadingTable {
    /// Build a custom table. Patterns are matched case-insensitively.
    pub fn new<'a>(
        entries: impl IntoIterator<Item = (CanonicalSection, &'a str)>,
    ) -> Result<Self, regex::Error> {
        let patterns = entries
            .into_iter()
            .map(|(section, pattern)| {
                Ok(HeadingPattern {
                    section,
                    regex: compile(pattern)?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { patterns })
    }

    /// The proposal template's headings, one per canonical section.
    pub fn proposal() -> &'static HeadingTable {
        &PROPOSAL_HEADINGS
    }

    pub fn patterns(&self) -> &[HeadingPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
