//! PDF text-layer extraction via Google PDFium.
//!
//! PDFium keeps reading order on multi-column layouts better than
//! pdf-extract, so it sits first in the default chain. It is a runtime
//! dependency: when the shared library cannot be bound the engine reports
//! itself unavailable and the chain moves on.
//!
//! `PdfiumEngine` is stateless (`Send + Sync`). Each extraction creates a
//! fresh `Pdfium` instance because the upstream type is `!Send`. The OS
//! caches `dlopen`/`LoadLibrary` calls, so repeat loads are near-free.

use pdfium_render::prelude::*;
use tracing::debug;

use super::types::{DocumentKind, ExtractionEngine};
use super::ExtractionError;

pub struct PdfiumEngine {
    available: bool,
}

impl PdfiumEngine {
    /// Bind the library once to decide availability for the process lifetime.
    pub fn probe() -> Self {
        let available = match load_pdfium() {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "PDFium not loadable");
                false
            }
        };
        Self { available }
    }
}

/// Load the PDFium dynamic library.
///
/// Discovery order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path)
/// 2. Alongside the running executable
/// 3. System library search paths
pub(crate) fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            ExtractionError::PdfiumUnavailable(format!("Failed to load PDFium from {path}: {e}"))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            let lib_path =
                Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                debug!(dir = %exe_dir.display(), "Loaded PDFium next to executable");
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        ExtractionError::PdfiumUnavailable(format!(
            "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// Map PDF load errors, singling out encrypted documents.
fn map_load_error(e: PdfiumError) -> ExtractionError {
    let msg = format!("{e}");
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfParsing(format!("Failed to load PDF: {msg}"))
    }
}

impl ExtractionEngine for PdfiumEngine {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn accepts(&self, kind: DocumentKind) -> bool {
        matches!(kind, DocumentKind::Pdf | DocumentKind::Unknown)
    }

    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;

        let pages = document.pages();
        let mut texts = Vec::with_capacity(pages.len() as usize);

        for page in pages.iter() {
            // A page without a text layer contributes nothing.
            let text = page.text().map(|t| t.all()).unwrap_or_default();
            texts.push(text);
        }

        Ok(texts)
    }
}
