//! Analysis manager - Main Entry Point
//!
//! Runs the selectors listed in a steering file over its input files.

use anyhow::Context;
use clap::Parser;
use eventsel::{config::Store, AnalysisManager, JsonBackend, SelectorRegistry};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Run a sequence of selectors over the record files named in a steering file.
#[derive(Parser, Debug)]
#[command(name = "analysis-manager")]
#[command(version)]
struct Cli {
    /// Steering file
    steering: PathBuf,

    /// Also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let store = Store::from_file(&cli.steering)
        .with_context(|| format!("reading steering file {}", cli.steering.display()))?;

    let manager = AnalysisManager::new(
        store,
        Box::new(JsonBackend),
        &SelectorRegistry::with_builtin(),
    )
    .context("preparing the run")?;

    let summary = manager.run().context("running the analysis")?;
    tracing::info!(
        processed = summary.processed,
        accepted = summary.accepted,
        skipped = summary.skipped,
        failed = summary.failed,
        written = summary.written,
        "Run finished ({:.0} records/sec)",
        summary.frequency()
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,eventsel=debug"));
    let (file_layer, _guard) = match &cli.log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "analysis-manager.log".into());
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                ),
                Some(guard),
            )
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    tracing::info!("Starting program");

    match run(&cli) {
        Ok(()) => {
            tracing::info!("Leaving program");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
