use super::normalize::char_len;
use super::SectionMap;

/// Outcome of joining section slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembledText {
    /// Long enough to classify on its own.
    Sufficient(String),
    /// Below the floor; the caller must substitute the raw extracted text.
    Insufficient(String),
}

impl AssembledText {
    pub fn text(&self) -> &str {
        match self {
            Self::Sufficient(text) | Self::Insufficient(text) => text,
        }
    }

    pub fn is_sufficient(&self) -> bool {
        matches!(self, Self::Sufficient(_))
    }
}

/// Non-empty slots in canonical order, each trimmed, single-space separated.
pub fn join_sections(sections: &SectionMap) -> String {
    sections
        .iter()
        .map(|(_, text)| text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Join sections and check the result against `min_chars`.
pub fn assemble(sections: &SectionMap, min_chars: usize) -> AssembledText {
    let text = join_sections(sections);
    if char_len(&text) < min_chars {
        AssembledText::Insufficient(text)
    } else {
        AssembledText::Sufficient(text)
    }
}
