use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use argus_analysis::{AllocationOracle, Analyzer, TextReporter};

/// Static buffer-overflow analyzer for textual SSA IR modules.
#[derive(Parser, Debug)]
#[command(name = "argus", version, about)]
struct Cli {
    /// Input module
    input: PathBuf,

    /// Also print indeterminate findings
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let module = argus_syntax::parse_module(&source)
        .with_context(|| format!("failed to parse module {}", cli.input.display()))?;

    let stdout = std::io::stdout();
    let mut reporter = TextReporter::new(stdout.lock());
    let totals = Analyzer::new(
        &module,
        AllocationOracle::default(),
        cli.verbose,
        &mut reporter,
    )
    .run();
    drop(reporter);
    println!("{totals}");
    Ok(())
}
