//! gpustress command-line interface.

mod commands;
mod logging;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "gpustress", version, about = "GPU stress testing and benchmarking")]
struct Cli {
    /// Log filter, e.g. `debug` or `gpustress_core=trace` (defaults to RUST_LOG, then info)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a stress test or benchmark
    Run(commands::RunArgs),
    /// Take one hardware snapshot and print it as JSON
    Probe(commands::ProbeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init_logging(cli.log_level.as_deref(), cli.log_dir.clone());

    match cli.command {
        Command::Run(args) => commands::run(args).await,
        Command::Probe(args) => commands::probe(args).await,
    }
}
