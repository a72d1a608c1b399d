use std::fmt;

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Broad document kinds the engines understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    PlainText,
    Unknown,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::PlainText => "plain_text",
            Self::Unknown => "unknown",
        }
    }

    /// Magic bytes first, declared content type second.
    pub fn detect(bytes: &[u8], content_type: Option<&str>) -> Self {
        if bytes.starts_with(b"%PDF") {
            return Self::Pdf;
        }

        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());

        match essence.as_deref() {
            Some("application/pdf") => Self::Pdf,
            Some(ct) if ct.starts_with("text/plain") => Self::PlainText,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw document bytes plus the declared content type.
///
/// Owned by exactly one pipeline run. The buffer is released when the value
/// goes out of scope, on success and failure paths alike.
pub struct SourceDocument {
    bytes: Vec<u8>,
    content_type: Option<String>,
    kind: DocumentKind,
}

impl SourceDocument {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        let kind = DocumentKind::detect(&bytes, content_type.as_deref());
        Self {
            bytes,
            content_type,
            kind,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("bytes", &self.bytes.len())
            .field("content_type", &self.content_type)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Text produced by the winning engine.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub engine: &'static str,
    /// Page texts joined with `\n`; pages without text contribute nothing.
    /// Not whitespace-normalized.
    pub text: String,
    pub page_count: usize,
    pub pages_with_text: usize,
}

impl ExtractedText {
    pub fn from_pages(engine: &'static str, pages: Vec<String>) -> Self {
        let page_count = pages.len();
        let mut text = String::new();
        let mut pages_with_text = 0;

        for (i, page) in pages.iter().enumerate() {
            if page.is_empty() {
                tracing::debug!(engine, page = i + 1, "Page produced no text");
                continue;
            }
            tracing::debug!(engine, page = i + 1, chars = page.chars().count(), "Extracted page");
            text.push_str(page);
            text.push('\n');
            pages_with_text += 1;
        }

        Self {
            engine,
            text,
            page_count,
            pages_with_text,
        }
    }

    /// True when nothing but whitespace was extracted.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One interchangeable text extraction engine.
pub trait ExtractionEngine {
    fn name(&self) -> &'static str;

    /// Whether the engine is installed/configured in this process.
    fn is_available(&self) -> bool;

    fn accepts(&self, kind: DocumentKind) -> bool;

    /// Per-page text, in page order.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}
