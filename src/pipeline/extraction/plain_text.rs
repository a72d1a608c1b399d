use super::types::{DocumentKind, ExtractionEngine};
use super::ExtractionError;

/// UTF-8 read of plain-text proposals. The whole document is one page.
pub struct PlainTextEngine;

impl ExtractionEngine for PlainTextEngine {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn accepts(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::PlainText
    }

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ExtractionError::EncodingError(e.to_string()))?;
        // A leading BOM would otherwise shift heading offsets.
        Ok(vec![text.trim_start_matches('\u{feff}').to_string()])
    }
}
