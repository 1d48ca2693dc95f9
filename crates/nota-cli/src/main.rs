//! CLI application for Indonesian receipt grand-total extraction.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use nota_core::{NotaConfig, PureOcrBackend, ReceiptService};

/// Extract the grand total from Indonesian receipt images and PDFs
#[derive(Parser)]
#[command(name = "nota")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to input image or PDF
    #[arg(long)]
    input: PathBuf,

    /// Emit compact JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory containing OCR model files
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = if let Some(path) = &cli.config {
        NotaConfig::from_file(path)?
    } else {
        NotaConfig::default()
    };

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    let model_dir = cli
        .model_dir
        .clone()
        .unwrap_or_else(|| default_model_dir(&config));
    debug!("Using models from {}", model_dir.display());

    let backend = PureOcrBackend::from_dir(&model_dir, &config.models).map_err(|e| {
        anyhow::anyhow!(
            "{} ({}). Place det/rec models and the dictionary under {}.",
            style("Failed to load OCR models").red(),
            e,
            model_dir.display()
        )
    })?;
    let service = ReceiptService::new(backend, config);

    let spinner = (!cli.json).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(format!("Processing {}", cli.input.display()));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = service.process(&cli.input);

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let output = if cli.json {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{}", output);

    Ok(())
}

/// Default model directory: `<data-dir>/nota/models`, falling back to the
/// configured relative path.
fn default_model_dir(config: &NotaConfig) -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("nota").join("models"))
        .unwrap_or_else(|| config.models.model_dir.clone())
}
