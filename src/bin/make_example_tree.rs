//! Writes a random example record file for the `ExampleSelector`.

use anyhow::Context;
use clap::Parser;
use eventsel::{example_tree, stream::RecordFile, JsonBackend, RecordBackend};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Generate an example input file.
#[derive(Parser, Debug)]
#[command(name = "make-example-tree")]
#[command(version)]
struct Cli {
    /// Output record file
    #[arg(short, long, default_value = "ExampleTree.json")]
    output: String,

    /// Number of records to generate
    #[arg(short = 'n', long, default_value_t = 100_000)]
    entries: usize,

    /// Random seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Name of the tree
    #[arg(long, default_value = "tree")]
    tree_name: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    tracing::info!(
        entries = cli.entries,
        seed = cli.seed,
        "Generating tree '{}'",
        cli.tree_name
    );

    let tree = example_tree::generate(&cli.tree_name, cli.entries, cli.seed)
        .context("generating example tree")?;
    JsonBackend
        .write(&cli.output, &RecordFile::with_tree(tree))
        .with_context(|| format!("writing {}", cli.output))?;

    tracing::info!("Wrote {} records to {}", cli.entries, cli.output);
    Ok(())
}
