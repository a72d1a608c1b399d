//! Proposal section segmentation.
//!
//! Proposals follow a fixed template of numbered narrative sections.
//! `segmenter` slices raw extracted text at the section headings,
//! `assembler` joins the slices back together in template order.

pub mod headings;
pub mod normalize;
pub mod segmenter;
pub mod assembler;

pub use headings::*;
pub use normalize::*;
pub use segmenter::*;
pub use assembler::*;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Narrative sections of a business proposal, in template order.
///
/// Declaration order is the canonical order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalSection {
    Background,
    NoblePurpose,
    CustomerIdentification,
    InnovativeProduct,
    MarketingStrategy,
    Resources,
    FinancialProjection,
    BudgetPlan,
}

impl CanonicalSection {
    pub const ALL: [CanonicalSection; 8] = [
        Self::Background,
        Self::NoblePurpose,
        Self::CustomerIdentification,
        Self::InnovativeProduct,
        Self::MarketingStrategy,
        Self::Resources,
        Self::FinancialProjection,
        Self::BudgetPlan,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::NoblePurpose => "noble_purpose",
            Self::CustomerIdentification => "customer_identification",
            Self::InnovativeProduct => "innovative_product",
            Self::MarketingStrategy => "marketing_strategy",
            Self::Resources => "resources",
            Self::FinancialProjection => "financial_projection",
            Self::BudgetPlan => "budget_plan",
        }
    }

    /// Heading pattern of the Indonesian proposal template (matched case-insensitively).
    pub fn heading_pattern(&self) -> &'static str {
        match self {
            Self::Background => r"1\.1\s+Latar\s+Belakang\s+Usaha",
            Self::NoblePurpose => r"2\.1\s+Noble\s+Purpose",
            Self::CustomerIdentification => r"2\.2\s+Identifikasi\s+Konsumen",
            Self::InnovativeProduct => r"2\.3\s+Produk\s+Inovatif",
            Self::MarketingStrategy => r"2\.4\s+Strategi\s+Pemasaran",
            Self::Resources => r"2\.5\s+Sumber\s+Daya",
            Self::FinancialProjection => r"3\.1\s+Laporan/Proyeksi\s+Keuangan",
            Self::BudgetPlan => r"3\.2\s+Rencana\s+Anggaran\s+Belanja",
        }
    }
}

impl fmt::Display for CanonicalSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text slot for every canonical section.
///
/// Backed by a fixed array, so a slot can be empty but never missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<CanonicalSection, String>",
    into = "BTreeMap<CanonicalSection, String>"
)]
pub struct SectionMap {
    slots: [String; 8],
}

impl SectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, section: CanonicalSection) -> &str {
        &self.slots[section.index()]
    }

    /// Overwrites whatever the slot held before.
    pub fn set(&mut self, section: CanonicalSection, text: impl Into<String>) {
        self.slots[section.index()] = text.into();
    }

    /// All slots in canonical order, empty ones included.
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalSection, &str)> + '_ {
        CanonicalSection::ALL
            .iter()
            .map(move |s| (*s, self.slots[s.index()].as_str()))
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.filled_count() == 0
    }
}

/// Caller-supplied maps: missing keys stay empty, values are trimmed.
impl From<BTreeMap<CanonicalSection, String>> for SectionMap {
    fn from(entries: BTreeMap<CanonicalSection, String>) -> Self {
        let mut map = Self::new();
        for (section, text) in entries {
            map.set(section, text.trim());
        }
        map
    }
}

impl From<SectionMap> for BTreeMap<CanonicalSection, String> {
    fn from(map: SectionMap) -> Self {
        CanonicalSection::ALL
            .iter()
            .zip(map.slots)
            .map(|(section, text)| (*section, text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_map_has_every_slot_empty() {
        let map = SectionMap::new();
        assert_eq!(map.iter().count(), CanonicalSection::ALL.len());
        assert!(map.iter().all(|(_, text)| text.is_empty()));
        assert!(map.is_empty());
    }

    #[test]
    fn index_follows_declaration_order() {
        for (i, section) in CanonicalSection::ALL.iter().enumerate() {
            assert_eq!(section.index(), i);
        }
        assert!(CanonicalSection::Background < CanonicalSection::BudgetPlan);
    }

    #[test]
    fn set_overwrites_slot() {
        let mut map = SectionMap::new();
        map.set(CanonicalSection::Resources, "first");
        map.set(CanonicalSection::Resources, "second");
        assert_eq!(map.get(CanonicalSection::Resources), "second");
        assert_eq!(map.filled_count(), 1);
    }

    #[test]
    fn serializes_every_key_in_canonical_order() {
        let mut map = SectionMap::new();
        map.set(CanonicalSection::BudgetPlan, "Rp 10 juta");
        let json = serde_json::to_string(&map).unwrap();

        assert!(json.starts_with(r#"{"background":"""#));
        assert!(json.contains(r#""budget_plan":"Rp 10 juta""#));
        for section in CanonicalSection::ALL {
            assert!(json.contains(&format!("\"{}\"", section.as_str())));
        }
    }

    #[test]
    fn deserialize_fills_missing_keys_and_trims() {
        let map: SectionMap =
            serde_json::from_str(r#"{"noble_purpose": "  membantu UMKM  "}"#).unwrap();
        assert_eq!(map.get(CanonicalSection::NoblePurpose), "membantu UMKM");
        assert_eq!(map.get(CanonicalSection::Background), "");
        assert_eq!(map.filled_count(), 1);
    }

    #[test]
    fn deserialize_rejects_unknown_sections() {
        let result: Result<SectionMap, _> = serde_json::from_str(r#"{"appendix": "x"}"#);
        assert!(result.is_err());
    }
}
