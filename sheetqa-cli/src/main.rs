//! sheetqa CLI — ask natural-language questions about a spreadsheet.
//!
//! Loads the file, prints a preview, and answers questions either one-shot
//! (`--question`) or in an interactive loop.

mod repl;
mod table;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use sheetqa_core::{Dataset, QaPipeline, config, providers};

/// sheetqa: Ask questions about your spreadsheet
#[derive(Parser, Debug)]
#[command(name = "sheetqa", version, about, long_about = None)]
struct Cli {
    /// Spreadsheet to load (.csv, .xlsx, .xls, .ods)
    file: PathBuf,

    /// Ask a single question and exit (starts interactive mode if omitted)
    #[arg(short, long)]
    question: Option<String>,

    /// LLM model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "sheetqa", "sheetqa")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    // Subscriber is not up yet, so report straight to stderr.
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!(
            "warning: could not create log directory {}: {}",
            log_dir.display(),
            e
        );
    }
    let file_appender = tracing_appender::rolling::daily(&log_dir, "sheetqa.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let mut app_config = config::load_config(cli.config.as_deref())?;
    if let Some(model) = cli.model {
        app_config.llm.model = model;
    }

    // Missing credential is fatal before any input is accepted.
    let api_key = match config::resolve_api_key(&app_config.llm) {
        Ok(key) => key,
        Err(e) => {
            eprintln!("\x1b[31merror:\x1b[0m {}", e);
            eprintln!(
                "Set {} in the environment or a .env file.",
                app_config.llm.api_key_env
            );
            std::process::exit(1);
        }
    };
    let provider = providers::create_provider(&app_config.llm, api_key)?;

    let dataset = Dataset::load(&cli.file)?;
    tracing::info!(
        file = %cli.file.display(),
        rows = dataset.row_count(),
        model = app_config.llm.model.as_str(),
        "Dataset loaded"
    );
    let pipeline = QaPipeline::new(provider, &app_config.llm);

    if !cli.quiet {
        println!(
            "Loaded {} ({} rows, {} columns)\n",
            cli.file.display(),
            dataset.row_count(),
            dataset.columns().len()
        );
        println!("{}", table::render_dataset(&dataset.head(app_config.preview_rows)));
    }

    match cli.question {
        Some(question) => {
            let ok = repl::answer_one(&pipeline, &dataset, &question).await;
            if !ok {
                std::process::exit(1);
            }
        }
        None => repl::run(&pipeline, &dataset).await?,
    }

    Ok(())
}
