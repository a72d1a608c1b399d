use std::panic::{catch_unwind, AssertUnwindSafe};

use super::types::{DocumentKind, ExtractionEngine};
use super::ExtractionError;
use crate::pipeline::panic_message;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers; always available.
pub struct PdfExtractEngine;

impl ExtractionEngine for PdfExtractEngine {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn accepts(&self, kind: DocumentKind) -> bool {
        matches!(kind, DocumentKind::Pdf | DocumentKind::Unknown)
    }

    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        // pdf-extract panics on some malformed font and xref tables.
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        }));

        match outcome {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => {
                let msg = e.to_string();
                if msg.to_lowercase().contains("encrypt") {
                    Err(ExtractionError::PdfEncrypted)
                } else {
                    Err(ExtractionError::PdfParsing(msg))
                }
            }
            Err(panic_info) => Err(ExtractionError::EnginePanicked {
                engine: self.name(),
                message: panic_message(&*panic_info),
            }),
        }
    }
}
