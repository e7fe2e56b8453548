//! CLI for nvroof
//!
//! Commands:
//! - profile: Run a CUDA program under nvprof and build its roofline model
//! - analyze: Build the model from previously captured nvprof logs

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "nvroof")]
#[command(about = "nvroof - roofline models from nvprof metrics", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile a CUDA program
    Profile(commands::profile::ProfileArgs),

    /// Analyze captured nvprof logs, one file per pass
    Analyze(commands::analyze::AnalyzeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Profile(args) => {
            init_tracing(args.output.verbose);
            commands::profile::run(args)
        }
        Commands::Analyze(args) => {
            init_tracing(args.output.verbose);
            commands::analyze::run(args)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
