use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod config;
mod embedding;
mod error;
mod evaluation;
mod loader;
mod models;
mod output;
mod runner;

use crate::config::Config;
use crate::output::OutputFormat;
use crate::runner::Runner;

/// Compare vanilla and PPO-aligned model responses with heuristic scoring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML run file. Without one, the built-in evaluations read
    /// their CSV files from `outputs/`.
    run_file: Option<PathBuf>,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Verbose output - log progress for each scored pair to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match &args.run_file {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let runner = Runner::new(config);

    let run = runner.run_evaluations().await?;

    output::print_notices(&run.skipped, args.output);
    output::print_results(&run.results, args.output);

    Ok(())
}

/// `RUST_LOG` wins; otherwise warnings only, or debug with `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ppo_preference_eval={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
