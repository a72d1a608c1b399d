pub mod config;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

pub use pipeline::classify::{load_classifier, ClassificationResult, Prediction, ProposalClassifier};
pub use pipeline::processor::{
    build_processor, FailureKind, PipelineOutcome, PipelineResponse, ProcessRequest,
    ProposalProcessor, ProposalSource,
};
pub use pipeline::sections::{CanonicalSection, SectionMap};

/// Install the global `tracing` subscriber. `RUST_LOG` wins over the default
/// filter. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
