//! Fine-tuned BERT proposal classifier on ONNX Runtime.
//!
//! The model directory must contain:
//! - `model.onnx`: sequence classification export with a `[batch, 2]` logits output
//! - `tokenizer.json`: HuggingFace tokenizer definition

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use super::{ClassificationError, SequenceModel};
use crate::config::MAX_SEQUENCE_TOKENS;

const NUM_LABELS: usize = 2;

/// Uses interior mutability (Mutex) because ort::Session::run requires `&mut self`
/// but `SequenceModel` exposes `&self` for shared read-only use.
pub struct OnnxSequenceClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    device: &'static str,
}

impl OnnxSequenceClassifier {
    /// Load model and tokenizer from `model_dir`. Fails fast on missing files.
    pub fn load(model_dir: &Path) -> Result<Self, ClassificationError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(ClassificationError::ModelNotFound(model_path));
        }
        if !tokenizer_path.exists() {
            return Err(ClassificationError::ModelNotFound(tokenizer_path));
        }

        let mut builder = Session::builder()
            .map_err(|e: ort::Error| ClassificationError::ModelInit(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e| ClassificationError::ModelInit(e.to_string()))?;

        #[cfg(feature = "cuda")]
        let (mut builder, device) = {
            // ONNX Runtime falls back to CPU when no CUDA device is present.
            let builder = builder
                .with_execution_providers([
                    ort::execution_providers::CUDA::default().build(),
                ])
                .map_err(|e| ClassificationError::ModelInit(e.to_string()))?;
            (builder, "cuda-if-available")
        };
        #[cfg(not(feature = "cuda"))]
        let device = "cpu";

        let session = builder
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| ClassificationError::ModelInit(format!("ONNX load failed: {e}")))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ClassificationError::ModelInit(format!("Tokenizer load failed: {e}")))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| ClassificationError::ModelInit(format!("Truncation setup failed: {e}")))?;

        tracing::debug!(model_dir = %model_dir.display(), "ONNX session and tokenizer loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            device,
        })
    }

    /// Execution provider requested at load time.
    pub fn device(&self) -> &'static str {
        self.device
    }
}

impl SequenceModel for OnnxSequenceClassifier {
    fn name(&self) -> &str {
        "onnx-bert"
    }

    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassificationError> {
        use ort::value::TensorRef;

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ClassificationError::Tokenization(e.to_string()))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding
            .get_type_ids()
            .iter()
            .map(|&t| t as i64)
            .collect();

        let seq_len = input_ids.len();
        tracing::debug!(tokens = seq_len, "Tokenized proposal text");

        let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
            .map_err(|e| ClassificationError::Inference(e.to_string()))?;
        let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask)
            .map_err(|e| ClassificationError::Inference(e.to_string()))?;
        let type_array = ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids)
            .map_err(|e| ClassificationError::Inference(e.to_string()))?;

        let ids_tensor = TensorRef::from_array_view(&ids_array)
            .map_err(|e| ClassificationError::Inference(e.to_string()))?;
        let mask_tensor = TensorRef::from_array_view(&mask_array)
            .map_err(|e| ClassificationError::Inference(e.to_string()))?;
        let type_tensor = TensorRef::from_array_view(&type_array)
            .map_err(|e| ClassificationError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassificationError::Inference("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
            .map_err(|e| ClassificationError::Inference(format!("ONNX inference failed: {e}")))?;

        let (shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassificationError::UnexpectedOutput(format!("Output extraction: {e}")))?;

        if shape.len() != 2 || shape[1] as usize != NUM_LABELS {
            return Err(ClassificationError::UnexpectedOutput(format!(
                "Unexpected output shape: {shape:?}, expected [1, {NUM_LABELS}]"
            )));
        }

        Ok(logits[..NUM_LABELS].to_vec())
    }
}
