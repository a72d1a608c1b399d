use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ClassificationError, ClassificationResult, Prediction, ProposalClassifier};
use crate::pipeline::panic_message;

/// Two-label sequence classification model: raw logits for one text.
pub trait SequenceModel {
    fn name(&self) -> &str;

    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassificationError>;
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .copied()
        .map(f64::from)
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&l| (f64::from(l) - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Softmax + argmax over two logits. Ties go to the lower index.
pub fn verdict_from_logits(logits: &[f32]) -> Result<ClassificationResult, ClassificationError> {
    if logits.len() != 2 {
        return Err(ClassificationError::UnexpectedOutput(format!(
            "expected 2 logits, got {}",
            logits.len()
        )));
    }
    if logits.iter().any(|l| !l.is_finite()) {
        return Err(ClassificationError::UnexpectedOutput(format!(
            "non-finite logits {logits:?}"
        )));
    }

    let probabilities = softmax(logits);
    let mut label = 0;
    for (i, p) in probabilities.iter().enumerate() {
        if *p > probabilities[label] {
            label = i;
        }
    }

    Ok(ClassificationResult::from_model(
        Prediction::from_label(label),
        probabilities[label],
    ))
}

/// Production classifier around any `SequenceModel`.
///
/// The model is loaded before construction and only read afterwards, so a
/// single instance is shared by every pipeline run.
pub struct ModelClassifier {
    model: Box<dyn SequenceModel + Send + Sync>,
}

impl ModelClassifier {
    pub fn new(model: Box<dyn SequenceModel + Send + Sync>) -> Self {
        Self { model }
    }

    fn infer(&self, text: &str) -> Result<ClassificationResult, ClassificationError> {
        let logits = catch_unwind(AssertUnwindSafe(|| self.model.logits(text))).map_err(
            |panic_info| {
                ClassificationError::Inference(format!(
                    "model panicked: {}",
                    panic_message(&*panic_info)
                ))
            },
        )??;

        verdict_from_logits(&logits)
    }
}

impl ProposalClassifier for ModelClassifier {
    fn classify(&self, text: &str) -> ClassificationResult {
        if text.trim().is_empty() {
            tracing::warn!("Empty proposal text, rejecting without inference");
            return ClassificationResult::empty_input();
        }

        match self.infer(text) {
            Ok(result) => {
                tracing::info!(
                    model = self.model.name(),
                    prediction = result.prediction.as_str(),
                    confidence = result.confidence,
                    "Classification complete"
                );
                result
            }
            Err(e) => {
                tracing::error!(model = self.model.name(), error = %e, "Classification failed");
                ClassificationResult::inference_failure(&e)
            }
        }
    }
}

// ── Mock for testing ──────────────────────────────────────

/// Model returning fixed logits (or a fixed failure) and counting calls.
pub struct MockSequenceModel {
    logits: Result<Vec<f32>, String>,
    calls: AtomicUsize,
}

impl MockSequenceModel {
    pub fn new(logits: &[f32]) -> Self {
        Self {
            logits: Ok(logits.to_vec()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            logits: Err(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SequenceModel for MockSequenceModel {
    fn name(&self) -> &str {
        "mock"
    }

    fn logits(&self, _text: &str) -> Result<Vec<f32>, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.logits.clone().map_err(ClassificationError::Inference)
    }
}

impl<T: SequenceModel + ?Sized> SequenceModel for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassificationError> {
        (**self).logits(text)
    }
}
