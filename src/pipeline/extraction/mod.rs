pub mod types;
pub mod chain;
pub mod pdf;
pub mod pdfium;
pub mod plain_text;

pub use types::*;
pub use chain::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF is encrypted")]
    PdfEncrypted,

    #[error("PDFium library unavailable: {0}")]
    PdfiumUnavailable(String),

    #[error("Text encoding error: {0}")]
    EncodingError(String),

    #[error("Extraction engine {engine} panicked: {message}")]
    EnginePanicked { engine: &'static str, message: String },

    #[error("No extraction engine available for {kind} documents")]
    NoEngineAvailable { kind: DocumentKind },

    #[error("Every extraction engine failed: {0}")]
    AllEnginesFailed(String),
}
