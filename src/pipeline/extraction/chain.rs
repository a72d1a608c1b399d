//! Prioritized extraction engine chain.
//!
//! Engines are tried in order. An engine that does not accept the document
//! kind, or is not available in this process, is skipped silently. The first
//! engine that completes without error wins; a failing engine hands over to
//! the next one.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::pdf::PdfExtractEngine;
use super::pdfium::PdfiumEngine;
use super::plain_text::PlainTextEngine;
use super::types::{ExtractedText, ExtractionEngine, SourceDocument};
use super::ExtractionError;

pub struct EngineChain {
    engines: Vec<Box<dyn ExtractionEngine + Send + Sync>>,
}

impl EngineChain {
    pub fn new(engines: Vec<Box<dyn ExtractionEngine + Send + Sync>>) -> Self {
        Self { engines }
    }

    /// PDFium text layer, then pdf-extract, then plain UTF-8 text.
    pub fn with_default_engines() -> Self {
        Self::new(vec![
            Box::new(PdfiumEngine::probe()),
            Box::new(PdfExtractEngine),
            Box::new(PlainTextEngine),
        ])
    }

    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    pub fn extract(&self, document: &SourceDocument) -> Result<ExtractedText, ExtractionError> {
        let kind = document.kind();
        let mut failures = Vec::new();

        for engine in &self.engines {
            if !engine.accepts(kind) {
                continue;
            }
            if !engine.is_available() {
                tracing::info!(engine = engine.name(), "Extraction engine unavailable, trying next");
                continue;
            }

            match engine.extract_pages(document.bytes()) {
                Ok(pages) => {
                    let extracted = ExtractedText::from_pages(engine.name(), pages);
                    tracing::info!(
                        engine = extracted.engine,
                        kind = kind.as_str(),
                        pages = extracted.page_count,
                        pages_with_text = extracted.pages_with_text,
                        text_length = extracted.text.chars().count(),
                        "Text extraction complete"
                    );
                    return Ok(extracted);
                }
                Err(e) => {
                    tracing::warn!(engine = engine.name(), error = %e, "Extraction engine failed, trying next");
                    failures.push(format!("{}: {e}", engine.name()));
                }
            }
        }

        if failures.is_empty() {
            tracing::error!(kind = kind.as_str(), "No extraction engine available");
            Err(ExtractionError::NoEngineAvailable { kind })
        } else {
            Err(ExtractionError::AllEnginesFailed(failures.join("; ")))
        }
    }
}

// ── Mock for testing ──────────────────────────────────────

/// Engine returning fixed pages (or a fixed failure) and counting invocations.
pub struct MockEngine {
    name: &'static str,
    available: bool,
    pages: Result<Vec<String>, String>,
    calls: AtomicUsize,
}

impl MockEngine {
    pub fn new(name: &'static str, pages: &[&str]) -> Self {
        Self {
            name,
            available: true,
            pages: Ok(pages.iter().map(|p| p.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str, reason: &str) -> Self {
        Self {
            name,
            available: true,
            pages: Err(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(name: &'static str) -> Self {
        Self {
            available: false,
            ..Self::new(name, &[])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExtractionEngine for MockEngine {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn accepts(&self, _kind: super::DocumentKind) -> bool {
        true
    }

    fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages.clone().map_err(ExtractionError::PdfParsing)
    }
}

impl<T: ExtractionEngine + ?Sized> ExtractionEngine for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn accepts(&self, kind: super::DocumentKind) -> bool {
        (**self).accepts(kind)
    }

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        (**self).extract_pages(bytes)
    }
}
