//! Pass/reject classification of proposal text.
//!
//! `ModelClassifier` wraps a pre-trained two-label sequence model and turns
//! its logits into a `ClassificationResult`. It never returns an error:
//! empty input and inference failures both degrade to a reject verdict.

pub mod model;
#[cfg(feature = "onnx-classifier")]
pub mod onnx;

pub use model::*;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PASS_MESSAGE: &str = "PASS - Proposal meets the administrative and substantive criteria";
pub const REJECT_MESSAGE: &str =
    "REJECT - Proposal does not meet the criteria or its description is incomplete";
pub const EMPTY_INPUT_MESSAGE: &str = "Proposal is empty or invalid";

#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("Classifier model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Classifier model initialization: {0}")]
    ModelInit(String),

    #[error("Tokenization error: {0}")]
    Tokenization(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unexpected model output: {0}")]
    UnexpectedOutput(String),

    #[error("Classifier support not compiled in (enable the `onnx-classifier` feature)")]
    BackendDisabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prediction {
    Pass,
    Reject,
}

impl Prediction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Reject => "reject",
        }
    }

    /// Model label: 1 is pass, 0 is reject.
    pub fn label(&self) -> u8 {
        match self {
            Self::Pass => 1,
            Self::Reject => 0,
        }
    }

    pub fn from_label(label: usize) -> Self {
        if label == 1 {
            Self::Pass
        } else {
            Self::Reject
        }
    }
}

/// Stable verdict record handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub prediction: Prediction,
    /// Probability of `prediction`, in [0, 1], rounded to 4 decimals.
    pub confidence: f64,
    /// Always `prediction.label()`.
    pub label: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
}

impl ClassificationResult {
    pub fn new(prediction: Prediction, confidence: f64, message: impl Into<String>) -> Self {
        Self {
            prediction,
            confidence: round4(confidence.clamp(0.0, 1.0)),
            label: prediction.label(),
            message: message.into(),
            text_length: None,
        }
    }

    /// Verdict from the model's chosen label and its probability.
    pub fn from_model(prediction: Prediction, confidence: f64) -> Self {
        let message = match prediction {
            Prediction::Pass => PASS_MESSAGE,
            Prediction::Reject => REJECT_MESSAGE,
        };
        Self::new(prediction, confidence, message)
    }

    /// Short-circuit for empty or whitespace-only input.
    pub fn empty_input() -> Self {
        Self::new(Prediction::Reject, 1.0, EMPTY_INPUT_MESSAGE)
    }

    /// Degraded verdict when inference fails.
    pub fn inference_failure(error: &ClassificationError) -> Self {
        Self::new(Prediction::Reject, 0.0, format!("Classification error: {error}"))
    }

    pub fn with_text_length(mut self, text_length: usize) -> Self {
        self.text_length = Some(text_length);
        self
    }
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// `classify(text) -> ClassificationResult`; implementations never fail.
pub trait ProposalClassifier {
    fn classify(&self, text: &str) -> ClassificationResult;
}

/// Load the production classifier from `model_dir`, eagerly.
///
/// Missing artifacts fail here, at start-up, not on the first request.
pub fn load_classifier(
    model_dir: &Path,
) -> Result<Arc<dyn ProposalClassifier + Send + Sync>, ClassificationError> {
    #[cfg(feature = "onnx-classifier")]
    {
        let model = onnx::OnnxSequenceClassifier::load(model_dir)?;
        tracing::info!(
            model_dir = %model_dir.display(),
            device = model.device(),
            "Proposal classifier ready"
        );
        Ok(Arc::new(ModelClassifier::new(Box::new(model))))
    }

    #[cfg(not(feature = "onnx-classifier"))]
    {
        tracing::error!(
            model_dir = %model_dir.display(),
            "Built without the onnx-classifier feature"
        );
        Err(ClassificationError::BackendDisabled)
    }
}

// ── Mock for testing ──────────────────────────────────────

/// Classifier returning the same verdict for any non-empty text and recording
/// what it was asked to classify.
pub struct StaticClassifier {
    verdict: ClassificationResult,
    seen: std::sync::Mutex<Vec<String>>,
}

impl StaticClassifier {
    pub fn new(prediction: Prediction, confidence: f64) -> Self {
        Self {
            verdict: ClassificationResult::from_model(prediction, confidence),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Texts passed to `classify`, in call order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ProposalClassifier for StaticClassifier {
    fn classify(&self, text: &str) -> ClassificationResult {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(text.to_string());
        }
        if text.trim().is_empty() {
            return ClassificationResult::empty_input();
        }
        self.verdict.clone()
    }
}
