use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use proposal_screener::config::{self, PipelineConfig};
use proposal_screener::{
    build_processor, load_classifier, ProcessRequest, ProposalSource, SectionMap,
};

#[derive(Parser)]
#[command(
    name = "proposal-screener",
    about = "Screen business proposal documents with a fine-tuned pass/reject classifier",
    version
)]
struct Cli {
    /// Directory holding model.onnx and tokenizer.json
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Classify the assembled proposal sections instead of the raw text
    #[arg(long, global = true)]
    sections: bool,

    /// Opaque identifier echoed back in the output record
    #[arg(long, global = true)]
    correlation_id: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a proposal document and classify it
    Url {
        /// Public or presigned document URL
        url: String,
    },
    /// Classify a local proposal document (PDF or plain text)
    File {
        path: PathBuf,
    },
    /// Classify proposal text given directly ("-" reads stdin)
    Text {
        text: String,
    },
    /// Classify a JSON section map ("-" reads stdin)
    Sections {
        path: PathBuf,
    },
    /// Print the section map of a document without classifying it
    Segment {
        /// URL (http/https) or local file path
        source: String,
    },
}

enum Job {
    Screen(ProposalSource),
    Segment(ProposalSource),
}

fn main() -> ExitCode {
    proposal_screener::init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Start-up failed");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, String> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    // Resolve the input before loading the model so bad arguments fail fast.
    let job = job_for(cli.command)?;

    let mut pipeline_config = PipelineConfig::from_env();
    if let Some(dir) = cli.model_dir {
        pipeline_config.model_dir = dir;
    }

    let classifier = load_classifier(&pipeline_config.model_dir).map_err(|e| e.to_string())?;
    let processor = build_processor(pipeline_config, classifier);

    match job {
        Job::Segment(source) => {
            let sections = processor
                .extract_sections(&source)
                .map_err(|e| e.to_string())?;
            print_json(&sections, cli.pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        Job::Screen(source) => {
            let mut request = ProcessRequest::new(source).with_sections(cli.sections);
            if let Some(id) = cli.correlation_id {
                request = request.with_correlation_id(id);
            }

            let response = processor.process(request);
            print_json(&response, cli.pretty)?;

            if response.outcome.is_done() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(1))
            }
        }
    }
}

fn job_for(command: Commands) -> Result<Job, String> {
    let job = match command {
        Commands::Url { url } => Job::Screen(ProposalSource::Url(url)),
        Commands::File { path } => Job::Screen(ProposalSource::File(path)),
        Commands::Text { text } => {
            let text = if text == "-" { read_stdin()? } else { text };
            Job::Screen(ProposalSource::Text(text))
        }
        Commands::Sections { path } => {
            let raw = if path.as_os_str() == "-" {
                read_stdin()?
            } else {
                std::fs::read_to_string(&path)
                    .map_err(|e| format!("Could not read {}: {e}", path.display()))?
            };
            let sections: SectionMap =
                serde_json::from_str(&raw).map_err(|e| format!("Invalid section map: {e}"))?;
            Job::Screen(ProposalSource::Sections(sections))
        }
        Commands::Segment { source } => Job::Segment(source_from_arg(source)),
    };
    Ok(job)
}

fn source_from_arg(arg: String) -> ProposalSource {
    if arg.starts_with("http://") || arg.starts_with("https://") {
        ProposalSource::Url(arg)
    } else {
        ProposalSource::File(PathBuf::from(arg))
    }
}

fn read_stdin() -> Result<String, String> {
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| format!("Could not read stdin: {e}"))?;
    Ok(buffer)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| format!("Could not serialize output: {e}"))?;
    println!("{json}");
    Ok(())
}
