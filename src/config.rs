use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "ProposalScreener";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Network timeout for a single document download. No retry is attempted.
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Extracted text shorter than this (trimmed, in characters) is not classified.
pub const MIN_TEXT_CHARS: usize = 50;

/// Assembled section text shorter than this falls back to the raw extracted text.
pub const MIN_ASSEMBLED_CHARS: usize = 100;

/// Token window of the classifier; longer input is truncated.
pub const MAX_SEQUENCE_TOKENS: usize = 512;

const MODEL_DIR_ENV: &str = "PROPOSAL_SCREENER_MODEL_DIR";
const FETCH_TIMEOUT_ENV: &str = "PROPOSAL_SCREENER_FETCH_TIMEOUT_SECS";

/// Get the application data directory
/// ~/ProposalScreener/ on all platforms
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Get the models directory
pub fn models_dir() -> PathBuf {
    app_data_dir().join("models")
}

/// Get the fine-tuned proposal classifier directory (`model.onnx` + `tokenizer.json`)
pub fn classifier_model_dir() -> PathBuf {
    models_dir().join("proposal-classifier")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "proposal_screener=info,warn"
}

/// Runtime configuration of the screening pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Timeout for the single download attempt.
    pub fetch_timeout_secs: u64,
    /// Length gate applied to extracted text before any segmentation.
    pub min_text_chars: usize,
    /// Floor under which assembled section text is discarded.
    pub min_assembled_chars: usize,
    /// Directory holding the classifier artifacts.
    pub model_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: FETCH_TIMEOUT_SECS,
            min_text_chars: MIN_TEXT_CHARS,
            min_assembled_chars: MIN_ASSEMBLED_CHARS,
            model_dir: classifier_model_dir(),
        }
    }
}

impl PipelineConfig {
    /// Defaults with `PROPOSAL_SCREENER_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var(MODEL_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.model_dir = PathBuf::from(dir);
            }
        }

        if let Ok(raw) = std::env::var(FETCH_TIMEOUT_ENV) {
            match parse_timeout(&raw) {
                Some(secs) => config.fetch_timeout_secs = secs,
                None => tracing::warn!(
                    value = %raw,
                    "Ignoring invalid {FETCH_TIMEOUT_ENV}, keeping {}s",
                    config.fetch_timeout_secs
                ),
            }
        }

        config
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn parse_timeout(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|secs| *secs > 0)
}
