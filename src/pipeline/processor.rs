//! Proposal screening orchestrator.
//!
//! Single entry point that drives the full pipeline:
//! fetch → extract → length gate → (segment → assemble) → classify.
//!
//! Every collaborator is injected through a trait (`DocumentFetcher`,
//! `ExtractionEngine`, `ProposalClassifier`) so the orchestrator is tested
//! with mocks, without network access or model files. `process` never fails:
//! each call ends in `Done` or `Failed`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::pipeline::classify::{ClassificationResult, ProposalClassifier};
use crate::pipeline::extraction::{EngineChain, ExtractionError};
use crate::pipeline::fetch::{read_local_document, DocumentFetcher, FetchError, HttpFetcher};
use crate::pipeline::panic_message;
use crate::pipeline::sections::{
    assemble, char_len, join_sections, segment, AssembledText, HeadingTable, SectionMap,
};

const EMPTY_TEXT_MESSAGE: &str = "No usable text could be extracted from the document. \
     Likely causes: (1) the document source is not accessible, \
     (2) the document is corrupt or empty, \
     (3) the file format is not supported";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Terminal pipeline errors. Classification problems never show up here;
/// the classifier absorbs them into a reject verdict.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Failed to retrieve document: {0}")]
    Fetch(#[from] FetchError),

    #[error("Text extraction unavailable: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("{}", empty_text_message(.detail))]
    EmptyText { detail: Option<String> },

    #[error("Extracted text is too short: {length} characters, minimum is {minimum}")]
    TooShort { length: usize, minimum: usize },

    #[error("Pipeline aborted: {0}")]
    Internal(String),
}

fn empty_text_message(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!("{EMPTY_TEXT_MESSAGE} [{detail}]"),
        None => EMPTY_TEXT_MESSAGE.to_string(),
    }
}

impl ProcessingError {
    /// An engine that ran and failed means the document itself is unusable;
    /// only an empty chain is reported as unavailable extraction.
    fn from_extraction(error: ExtractionError) -> Self {
        match error {
            ExtractionError::NoEngineAvailable { .. } => Self::Extraction(error),
            other => Self::EmptyText {
                detail: Some(other.to_string()),
            },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Fetch(_) => FailureKind::DownloadError,
            Self::Extraction(_) => FailureKind::ExtractionUnavailable,
            Self::EmptyText { .. } => FailureKind::EmptyTextError,
            Self::TooShort { .. } => FailureKind::TooShortError,
            Self::Internal(_) => FailureKind::InternalError,
        }
    }

    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Fetch(_) => Some(PipelineStage::Fetching),
            Self::Extraction(_) | Self::EmptyText { .. } => Some(PipelineStage::Extracting),
            Self::TooShort { .. } => Some(PipelineStage::LengthGating),
            Self::Internal(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / outcome types
// ---------------------------------------------------------------------------

/// What to screen.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalSource {
    /// Public or presigned document URL.
    Url(String),
    /// Local document file.
    File(PathBuf),
    /// Already extracted plain text.
    Text(String),
    /// Already structured proposal; skips fetch, extraction and segmentation.
    Sections(SectionMap),
}

impl ProposalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::File(_) => "file",
            Self::Text(_) => "text",
            Self::Sections(_) => "sections",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub source: ProposalSource,
    /// Segment the text and classify the assembled sections instead of the
    /// raw text. Ignored for `ProposalSource::Sections`.
    pub extract_sections: bool,
    /// Opaque caller identifier (record key, job id), echoed back untouched.
    pub correlation_id: Option<String>,
}

impl ProcessRequest {
    pub fn new(source: ProposalSource) -> Self {
        Self {
            source,
            extract_sections: false,
            correlation_id: None,
        }
    }

    pub fn with_sections(mut self, extract_sections: bool) -> Self {
        self.extract_sections = extract_sections;
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Fetching,
    Extracting,
    LengthGating,
    Segmenting,
    Assembling,
    Classifying,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::LengthGating => "length_gating",
            Self::Segmenting => "segmenting",
            Self::Assembling => "assembling",
            Self::Classifying => "classifying",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DownloadError,
    ExtractionUnavailable,
    EmptyTextError,
    TooShortError,
    /// A collaborator panicked outside the contained engine/model boundaries.
    InternalError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DownloadError => "download_error",
            Self::ExtractionUnavailable => "extraction_unavailable",
            Self::EmptyTextError => "empty_text_error",
            Self::TooShortError => "too_short_error",
            Self::InternalError => "internal_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineFailure {
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<PipelineStage>,
    pub message: String,
}

impl From<&ProcessingError> for PipelineFailure {
    fn from(error: &ProcessingError) -> Self {
        Self {
            kind: error.kind(),
            stage: error.stage(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Done(ClassificationResult),
    Failed(PipelineFailure),
}

impl PipelineOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            Self::Done(result) => Some(result),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&PipelineFailure> {
        match self {
            Self::Done(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

/// One response per `process` call.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub run_id: Uuid,
    #[serde(flatten)]
    pub outcome: PipelineOutcome,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Screens proposals. Holds no per-request state; one instance serves
/// concurrent callers.
pub struct ProposalProcessor {
    fetcher: Box<dyn DocumentFetcher + Send + Sync>,
    extractor: EngineChain,
    headings: &'static HeadingTable,
    classifier: Arc<dyn ProposalClassifier + Send + Sync>,
    config: PipelineConfig,
}

impl ProposalProcessor {
    pub fn new(
        fetcher: Box<dyn DocumentFetcher + Send + Sync>,
        extractor: EngineChain,
        classifier: Arc<dyn ProposalClassifier + Send + Sync>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            headings: HeadingTable::proposal(),
            classifier,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one request to completion. Never fails and never panics past
    /// this boundary.
    pub fn process(&self, request: ProcessRequest) -> PipelineResponse {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("screening", run_id = %run_id);
        let _guard = span.enter();

        tracing::info!(
            source = request.source.as_str(),
            extract_sections = request.extract_sections,
            correlation_id = request.correlation_id.as_deref().unwrap_or("-"),
            "Screening started"
        );

        let result = catch_unwind(AssertUnwindSafe(|| {
            self.run(&request.source, request.extract_sections)
        }))
        .unwrap_or_else(|panic_info| {
            Err(ProcessingError::Internal(panic_message(&*panic_info)))
        });

        let outcome = match result {
            Ok(verdict) => {
                tracing::info!(
                    prediction = verdict.prediction.as_str(),
                    confidence = verdict.confidence,
                    text_length = verdict.text_length,
                    "Screening complete"
                );
                PipelineOutcome::Done(verdict)
            }
            Err(e) => {
                let failure = PipelineFailure::from(&e);
                tracing::error!(
                    kind = failure.kind.as_str(),
                    stage = failure.stage.map(|s| s.as_str()).unwrap_or("-"),
                    error = %e,
                    "Screening failed"
                );
                PipelineOutcome::Failed(failure)
            }
        };

        PipelineResponse {
            correlation_id: request.correlation_id,
            run_id,
            outcome,
        }
    }

    /// `process` on the blocking thread pool, for async request handlers.
    pub async fn process_async(self: Arc<Self>, request: ProcessRequest) -> PipelineResponse {
        let correlation_id = request.correlation_id.clone();
        match tokio::task::spawn_blocking(move || self.process(request)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Screening task did not complete");
                PipelineResponse {
                    correlation_id,
                    run_id: Uuid::new_v4(),
                    outcome: PipelineOutcome::Failed(PipelineFailure::from(
                        &ProcessingError::Internal(e.to_string()),
                    )),
                }
            }
        }
    }

    /// Fetch, extract and segment, returning the section map itself.
    ///
    /// No length gate applies and nothing is classified. A supplied
    /// section map is returned as given.
    pub fn extract_sections(&self, source: &ProposalSource) -> Result<SectionMap, ProcessingError> {
        if let ProposalSource::Sections(sections) = source {
            return Ok(sections.clone());
        }

        let raw = self.load_text(source)?;
        if raw.trim().is_empty() {
            return Err(ProcessingError::EmptyText { detail: None });
        }

        tracing::info!(stage = PipelineStage::Segmenting.as_str(), "Segmenting text");
        Ok(segment(&raw, self.headings))
    }

    fn run(
        &self,
        source: &ProposalSource,
        extract_sections: bool,
    ) -> Result<ClassificationResult, ProcessingError> {
        if let ProposalSource::Sections(sections) = source {
            tracing::info!(
                stage = PipelineStage::Assembling.as_str(),
                filled = sections.filled_count(),
                "Assembling supplied sections"
            );
            return Ok(self.classify(join_sections(sections)));
        }

        let raw = self.load_text(source)?;
        self.check_length(&raw)?;

        let text = if extract_sections {
            self.structured_text(raw)
        } else {
            raw
        };

        Ok(self.classify(text))
    }

    /// Resolve a source to raw text, trimmed when it was extracted from a
    /// document. The fetched bytes live only inside this call and are
    /// released on every return path.
    fn load_text(&self, source: &ProposalSource) -> Result<String, ProcessingError> {
        let document = match source {
            ProposalSource::Url(url) => {
                tracing::info!(stage = PipelineStage::Fetching.as_str(), "Fetching document");
                self.fetcher.fetch(url)?
            }
            ProposalSource::File(path) => {
                tracing::info!(stage = PipelineStage::Fetching.as_str(), "Reading document");
                read_local_document(path)?
            }
            ProposalSource::Text(text) => return Ok(text.clone()),
            ProposalSource::Sections(sections) => return Ok(join_sections(sections)),
        };

        if document.is_empty() {
            return Err(ProcessingError::EmptyText {
                detail: Some("document has no content".to_string()),
            });
        }

        tracing::info!(
            stage = PipelineStage::Extracting.as_str(),
            kind = document.kind().as_str(),
            bytes = document.len(),
            "Extracting text"
        );

        let extracted = self
            .extractor
            .extract(&document)
            .map_err(ProcessingError::from_extraction)?;

        // Page breaks leave a trailing newline; page text itself stays as extracted.
        Ok(extracted.text.trim().to_string())
    }

    fn check_length(&self, text: &str) -> Result<(), ProcessingError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ProcessingError::EmptyText { detail: None });
        }

        let length = char_len(trimmed);
        if length < self.config.min_text_chars {
            return Err(ProcessingError::TooShort {
                length,
                minimum: self.config.min_text_chars,
            });
        }

        tracing::debug!(
            stage = PipelineStage::LengthGating.as_str(),
            text_length = length,
            "Length gate passed"
        );
        Ok(())
    }

    /// Assembled sections, or the raw text when assembly falls under the floor.
    fn structured_text(&self, raw: String) -> String {
        tracing::info!(stage = PipelineStage::Segmenting.as_str(), "Segmenting text");
        let sections = segment(&raw, self.headings);

        match assemble(&sections, self.config.min_assembled_chars) {
            AssembledText::Sufficient(text) => {
                tracing::info!(
                    stage = PipelineStage::Assembling.as_str(),
                    text_length = char_len(&text),
                    "Using assembled sections"
                );
                text
            }
            AssembledText::Insufficient(text) => {
                tracing::warn!(
                    stage = PipelineStage::Assembling.as_str(),
                    assembled_length = char_len(&text),
                    minimum = self.config.min_assembled_chars,
                    "Assembled sections too short, using raw text"
                );
                raw
            }
        }
    }

    fn classify(&self, text: String) -> ClassificationResult {
        let text_length = char_len(&text);
        tracing::info!(
            stage = PipelineStage::Classifying.as_str(),
            text_length,
            "Classifying proposal"
        );
        self.classifier.classify(&text).with_text_length(text_length)
    }
}

/// Build a processor with the HTTP fetcher and the default engine chain.
/// Safe to call from inside a tokio runtime.
pub fn build_processor(
    config: PipelineConfig,
    classifier: Arc<dyn ProposalClassifier + Send + Sync>,
) -> ProposalProcessor {
    let fetcher = HttpFetcher::new(config.fetch_timeout());
    let extractor = EngineChain::with_default_engines();

    tracing::info!(
        engines = ?extractor.engine_names(),
        fetch_timeout_secs = config.fetch_timeout_secs,
        "Proposal processor ready"
    );

    ProposalProcessor::new(Box::new(fetcher), extractor, classifier, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::classify::{
        ModelClassifier, MockSequenceModel, Prediction, StaticClassifier,
    };
    use crate::pipeline::extraction::pdf::PdfExtractEngine;
    use crate::pipeline::extraction::plain_text::PlainTextEngine;
    use crate::pipeline::extraction::MockEngine;
    use crate::pipeline::fetch::MockFetcher;
    use crate::pipeline::sections::CanonicalSection;

    const PROPOSAL_TEXT: &str = "Proposal usaha keripik singkong dari desa Sukamaju \
        untuk pasar mahasiswa dan pekerja kantoran di kota.";

    struct Harness {
        fetcher: Arc<MockFetcher>,
        engine: Arc<MockEngine>,
        classifier: Arc<StaticClassifier>,
        processor: ProposalProcessor,
    }

    fn harness_with(fetcher: MockFetcher, engine: MockEngine) -> Harness {
        let fetcher = Arc::new(fetcher);
        let engine = Arc::new(engine);
        let classifier = Arc::new(StaticClassifier::new(Prediction::Pass, 0.91));
        let processor = ProposalProcessor::new(
            Box::new(fetcher.clone()),
            EngineChain::new(vec![Box::new(engine.clone())]),
            classifier.clone(),
            PipelineConfig::default(),
        );
        Harness {
            fetcher,
            engine,
            classifier,
            processor,
        }
    }

    fn harness(pages: &[&str]) -> Harness {
        harness_with(
            MockFetcher::with_document(b"%PDF-1.4 test", Some("application/pdf")),
            MockEngine::new("mock", pages),
        )
    }

    fn url_request() -> ProcessRequest {
        ProcessRequest::new(ProposalSource::Url("https://files.test/p.pdf".into()))
    }

    fn expect_failure(response: &PipelineResponse) -> &PipelineFailure {
        response
            .outcome
            .failure()
            .unwrap_or_else(|| panic!("expected failure, got {:?}", response.outcome))
    }

    fn expect_done(response: &PipelineResponse) -> &ClassificationResult {
        response
            .outcome
            .result()
            .unwrap_or_else(|| panic!("expected verdict, got {:?}", response.outcome))
    }

    #[test]
    fn short_text_fails_without_extraction_or_classification() {
        let h = harness(&[PROPOSAL_TEXT]);
        let response = h
            .processor
            .process(ProcessRequest::new(ProposalSource::Text("short".into())));

        let failure = expect_failure(&response);
        assert_eq!(failure.kind, FailureKind::TooShortError);
        assert_eq!(failure.stage, Some(PipelineStage::LengthGating));
        assert_eq!(h.fetcher.calls(), 0);
        assert_eq!(h.engine.calls(), 0);
        assert!(h.classifier.seen().is_empty());
    }

    #[test]
    fn empty_text_input_is_empty_text_error() {
        let h = harness(&[]);
        let response = h
            .processor
            .process(ProcessRequest::new(ProposalSource::Text("  \n ".into())));

        assert_eq!(expect_failure(&response).kind, FailureKind::EmptyTextError);
        assert!(h.classifier.seen().is_empty());
    }

    #[test]
    fn length_gate_counts_trimmed_characters() {
        let h = harness(&[]);
        let padded = format!("   {}   ", "x".repeat(49));
        let response = h
            .processor
            .process(ProcessRequest::new(ProposalSource::Text(padded)));
        assert_eq!(expect_failure(&response).kind, FailureKind::TooShortError);

        let exact = "é".repeat(50);
        let response = h
            .processor
            .process(ProcessRequest::new(ProposalSource::Text(exact)));
        assert!(response.outcome.is_done());
    }

    #[test]
    fn url_input_classifies_raw_extracted_text() {
        let h = harness(&[PROPOSAL_TEXT]);
        let response = h.processor.process(url_request());

        let result = expect_done(&response);
        assert_eq!(result.prediction, Prediction::Pass);
        assert_eq!(h.fetcher.calls(), 1);
        assert_eq!(h.engine.calls(), 1);

        let seen = h.classifier.seen();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("keripik singkong"));
        assert_eq!(result.text_length, Some(seen[0].chars().count()));
    }

    #[test]
    fn sufficient_sections_replace_raw_text() {
        let body_a = "Usaha kami memproduksi keripik singkong pedas dengan bahan baku petani lokal.";
        let body_b = "Membuka lapangan kerja bagi ibu rumah tangga di desa Sukamaju.";
        let page = format!(
            "PROPOSAL USAHA\n1.1 Latar Belakang Usaha\n{body_a}\n2.1 Noble Purpose\n{body_b}\n"
        );
        let h = harness(&[&page]);

        let response = h.processor.process(url_request().with_sections(true));
        let result = expect_done(&response);

        let expected = format!("{body_a} {body_b}");
        assert_eq!(h.classifier.seen(), vec![expected.clone()]);
        assert_eq!(result.text_length, Some(expected.chars().count()));
    }

    #[test]
    fn two_heading_text_assembles_in_order() {
        let text = "1.1 Latar Belakang Usaha content A 2.1 Noble Purpose content B";
        let sections = harness(&[text])
            .processor
            .extract_sections(&ProposalSource::Text(text.into()))
            .unwrap();

        assert_eq!(sections.get(CanonicalSection::Background), "content A");
        assert_eq!(sections.get(CanonicalSection::NoblePurpose), "content B");
        assert_eq!(join_sections(&sections), "content A content B");
    }

    #[test]
    fn short_assembly_falls_back_to_raw_text() {
        let content = "a".repeat(40);
        let page = format!("Pendahuluan proposal kami. 1.1 Latar Belakang Usaha {content}");
        let h = harness(&[&page]);

        let response = h.processor.process(url_request().with_sections(true));
        let result = expect_done(&response);

        let seen = h.classifier.seen();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("Pendahuluan proposal kami."));
        assert!(seen[0].contains("1.1 Latar Belakang Usaha"));
        assert_eq!(result.text_length, Some(seen[0].chars().count()));
    }

    #[test]
    fn no_headings_falls_back_to_raw_text() {
        let h = harness(&[PROPOSAL_TEXT]);
        let response = h.processor.process(url_request().with_sections(true));

        expect_done(&response);
        assert!(h.classifier.seen()[0].contains(PROPOSAL_TEXT));
    }

    #[test]
    fn download_failure_is_download_error() {
        let h = harness_with(MockFetcher::failing(404), MockEngine::new("mock", &[PROPOSAL_TEXT]));
        let response = h.processor.process(url_request());

        let failure = expect_failure(&response);
        assert_eq!(failure.kind, FailureKind::DownloadError);
        assert_eq!(failure.stage, Some(PipelineStage::Fetching));
        assert!(failure.message.contains("404"));
        assert_eq!(h.engine.calls(), 0);
        assert!(h.classifier.seen().is_empty());
    }

    #[test]
    fn no_usable_engine_is_extraction_unavailable() {
        let h = harness_with(
            MockFetcher::with_document(b"%PDF-1.4", None),
            MockEngine::unavailable("pdfium"),
        );
        let response = h.processor.process(url_request());

        let failure = expect_failure(&response);
        assert_eq!(failure.kind, FailureKind::ExtractionUnavailable);
        assert_eq!(failure.stage, Some(PipelineStage::Extracting));
    }

    #[test]
    fn failing_engines_are_empty_text_error_with_causes() {
        let h = harness_with(
            MockFetcher::with_document(b"%PDF-1.4", None),
            MockEngine::failing("pdf-extract", "invalid xref table"),
        );
        let response = h.processor.process(url_request());

        let failure = expect_failure(&response);
        assert_eq!(failure.kind, FailureKind::EmptyTextError);
        assert!(failure.message.contains("not accessible"));
        assert!(failure.message.contains("corrupt or empty"));
        assert!(failure.message.contains("not supported"));
        assert!(failure.message.contains("invalid xref table"));
    }

    #[test]
    fn blank_extraction_is_empty_text_error() {
        let h = harness(&["", "   ", "\n"]);
        let response = h.processor.process(url_request());

        let failure = expect_failure(&response);
        assert_eq!(failure.kind, FailureKind::EmptyTextError);
        assert!(failure.message.starts_with(EMPTY_TEXT_MESSAGE));
        assert!(h.classifier.seen().is_empty());
    }

    #[test]
    fn supplied_sections_skip_fetch_and_gates() {
        let h = harness(&[PROPOSAL_TEXT]);
        let mut sections = SectionMap::new();
        sections.set(CanonicalSection::BudgetPlan, "  Rp 5 juta ");
        sections.set(CanonicalSection::Background, "kopi");

        let response = h
            .processor
            .process(ProcessRequest::new(ProposalSource::Sections(sections)));
        let result = expect_done(&response);

        assert_eq!(h.classifier.seen(), vec!["kopi Rp 5 juta".to_string()]);
        assert_eq!(result.text_length, Some(14));
        assert_eq!(h.fetcher.calls(), 0);
        assert_eq!(h.engine.calls(), 0);
    }

    #[test]
    fn empty_supplied_sections_get_empty_input_verdict() {
        let h = harness(&[]);
        let response = h
            .processor
            .process(ProcessRequest::new(ProposalSource::Sections(SectionMap::new())));

        let result = expect_done(&response);
        assert_eq!(result.prediction, Prediction::Reject);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.text_length, Some(0));
    }

    #[test]
    fn text_file_input_uses_plain_text_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proposal.txt");
        std::fs::write(&path, PROPOSAL_TEXT).unwrap();

        let classifier = Arc::new(StaticClassifier::new(Prediction::Reject, 0.7));
        let processor = ProposalProcessor::new(
            Box::new(MockFetcher::failing(500)),
            EngineChain::new(vec![Box::new(PdfExtractEngine), Box::new(PlainTextEngine)]),
            classifier.clone(),
            PipelineConfig::default(),
        );

        let response = processor.process(ProcessRequest::new(ProposalSource::File(path)));
        let result = expect_done(&response);
        assert_eq!(result.prediction, Prediction::Reject);
        assert!(classifier.seen()[0].contains("keripik singkong"));
    }

    #[test]
    fn extracted_text_is_trimmed_before_gate_and_classifier() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proposal.txt");
        std::fs::write(&path, "y".repeat(60)).unwrap();

        let classifier = Arc::new(StaticClassifier::new(Prediction::Pass, 0.8));
        let processor = build_processor(PipelineConfig::default(), classifier.clone());

        let response = processor.process(ProcessRequest::new(ProposalSource::File(path)));
        let result = expect_done(&response);
        assert_eq!(result.text_length, Some(60));
        assert_eq!(classifier.seen(), vec!["y".repeat(60)]);
    }

    #[test]
    fn empty_document_skips_extraction() {
        let h = harness_with(
            MockFetcher::with_document(b"", Some("application/pdf")),
            MockEngine::new("mock", &[PROPOSAL_TEXT]),
        );
        let response = h.processor.process(url_request());

        let failure = expect_failure(&response);
        assert_eq!(failure.kind, FailureKind::EmptyTextError);
        assert!(failure.message.contains("document has no content"));
        assert_eq!(h.engine.calls(), 0);
    }

    #[test]
    fn missing_file_is_download_error() {
        let h = harness(&[PROPOSAL_TEXT]);
        let response = h.processor.process(ProcessRequest::new(ProposalSource::File(
            PathBuf::from("/nonexistent/proposal.pdf"),
        )));

        assert_eq!(expect_failure(&response).kind, FailureKind::DownloadError);
    }

    #[test]
    fn generated_pdf_runs_end_to_end() {
        let pdf = crate::pipeline::extraction::pdf::tests::make_test_pdf(&[
            "Proposal usaha keripik singkong untuk pasar mahasiswa di kota Bandung",
        ]);
        let classifier = Arc::new(StaticClassifier::new(Prediction::Pass, 0.88));
        let processor = ProposalProcessor::new(
            Box::new(MockFetcher::with_document(&pdf, Some("application/pdf"))),
            EngineChain::new(vec![Box::new(PdfExtractEngine)]),
            classifier.clone(),
            PipelineConfig::default(),
        );

        let response = processor.process(url_request());
        let result = expect_done(&response);
        assert_eq!(result.prediction, Prediction::Pass);
        assert_eq!(classifier.seen().len(), 1);
    }

    #[test]
    fn inference_failure_is_still_a_verdict() {
        let model = MockSequenceModel::failing("device lost");
        let processor = ProposalProcessor::new(
            Box::new(MockFetcher::failing(500)),
            EngineChain::new(Vec::new()),
            Arc::new(ModelClassifier::new(Box::new(model))),
            PipelineConfig::default(),
        );

        let response =
            processor.process(ProcessRequest::new(ProposalSource::Text(PROPOSAL_TEXT.into())));
        let result = expect_done(&response);
        assert_eq!(result.prediction, Prediction::Reject);
        assert_eq!(result.confidence, 0.0);
        assert!(result.message.contains("device lost"));
    }

    struct PanickingClassifier;

    impl ProposalClassifier for PanickingClassifier {
        fn classify(&self, _text: &str) -> ClassificationResult {
            panic!("classifier exploded")
        }
    }

    #[test]
    fn collaborator_panic_becomes_internal_failure() {
        let processor = ProposalProcessor::new(
            Box::new(MockFetcher::failing(500)),
            EngineChain::new(Vec::new()),
            Arc::new(PanickingClassifier),
            PipelineConfig::default(),
        );

        let response =
            processor.process(ProcessRequest::new(ProposalSource::Text(PROPOSAL_TEXT.into())));
        let failure = expect_failure(&response);
        assert_eq!(failure.kind, FailureKind::InternalError);
        assert!(failure.message.contains("classifier exploded"));
    }

    #[test]
    fn correlation_id_is_echoed_and_run_ids_differ() {
        let h = harness(&[PROPOSAL_TEXT]);
        let first = h
            .processor
            .process(url_request().with_correlation_id("proposal-42"));
        let second = h.processor.process(url_request());

        assert_eq!(first.correlation_id.as_deref(), Some("proposal-42"));
        assert_eq!(second.correlation_id, None);
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn done_response_serializes_flat() {
        let h = harness(&[PROPOSAL_TEXT]);
        let response = h.processor.process(url_request().with_correlation_id("p-7"));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], "done");
        assert_eq!(json["correlation_id"], "p-7");
        assert_eq!(json["prediction"], "pass");
        assert_eq!(json["label"], 1);
        assert!(json["text_length"].is_u64());
        assert!(json["run_id"].is_string());
    }

    #[test]
    fn failed_response_serializes_kind_and_stage() {
        let h = harness(&[]);
        let response = h
            .processor
            .process(ProcessRequest::new(ProposalSource::Text("short".into())));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "too_short_error");
        assert_eq!(json["stage"], "length_gating");
        assert!(json.get("correlation_id").is_none());
    }

    #[test]
    fn extract_sections_from_url() {
        let h = harness(&["2.4 Strategi Pemasaran jual online 2.5 Sumber Daya dua orang"]);
        let sections = h
            .processor
            .extract_sections(&ProposalSource::Url("https://files.test/p.pdf".into()))
            .unwrap();

        assert_eq!(sections.get(CanonicalSection::MarketingStrategy), "jual online");
        assert_eq!(sections.get(CanonicalSection::Resources), "dua orang");
        assert!(h.classifier.seen().is_empty());
    }

    #[test]
    fn extract_sections_skips_length_gate_but_not_empty_check() {
        let h = harness(&["tiny"]);
        let source = ProposalSource::Url("https://files.test/p.pdf".into());
        assert!(h.processor.extract_sections(&source).unwrap().is_empty());

        let blank = harness(&["  "]);
        let err = blank.processor.extract_sections(&source).unwrap_err();
        assert_eq!(err.kind(), FailureKind::EmptyTextError);
    }

    #[test]
    fn error_kinds_map_to_wire_names() {
        assert_eq!(FailureKind::DownloadError.as_str(), "download_error");
        assert_eq!(
            serde_json::to_value(FailureKind::ExtractionUnavailable).unwrap(),
            "extraction_unavailable"
        );
        let err = ProcessingError::TooShort {
            length: 5,
            minimum: 50,
        };
        assert_eq!(err.kind().as_str(), "too_short_error");
        assert!(err.to_string().contains("5 characters"));
    }

    #[tokio::test]
    async fn async_entry_point_runs_on_blocking_pool() {
        let h = harness(&[PROPOSAL_TEXT]);
        let processor = Arc::new(h.processor);

        let response = processor
            .clone()
            .process_async(url_request().with_correlation_id("async-1"))
            .await;

        assert!(response.outcome.is_done());
        assert_eq!(response.correlation_id.as_deref(), Some("async-1"));
    }

    #[tokio::test]
    async fn default_processor_is_built_and_dropped_inside_runtime() {
        let classifier = Arc::new(StaticClassifier::new(Prediction::Pass, 0.6));
        let processor = Arc::new(build_processor(PipelineConfig::default(), classifier));

        let response = processor
            .clone()
            .process_async(ProcessRequest::new(ProposalSource::Text(PROPOSAL_TEXT.into())))
            .await;
        assert!(response.outcome.is_done());

        drop(processor);
    }

    #[test]
    fn build_processor_uses_default_chain() {
        let classifier = Arc::new(StaticClassifier::new(Prediction::Pass, 0.5));
        let processor = build_processor(PipelineConfig::default(), classifier);
        assert_eq!(
            processor.extractor.engine_names(),
            vec!["pdfium", "pdf-extract", "plain-text"]
        );
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn processor_is_shareable() {
        assert_send_sync::<ProposalProcessor>();
    }
}
