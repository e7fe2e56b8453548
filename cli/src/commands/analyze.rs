//! Analyze command implementation

use super::OutputArgs;
use anyhow::Result;
use clap::Args;
use nvroof_gpu::{ingest_logs, name_resolver, ProcessRunner};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// nvprof logs (`--csv` output on stderr), one per pass, trace pass first
    #[arg(required = true)]
    pub logs: Vec<PathBuf>,

    /// Name of the Aspen model
    #[arg(short, long)]
    pub model_name: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let config = args.output.load_config()?;

    let runner = ProcessRunner;
    let mut resolver = name_resolver(&config, &runner);
    let table = ingest_logs(&config, &args.logs, &mut resolver)?;

    super::finish(
        table,
        args.model_name.clone(),
        &config,
        &args.output,
        resolver.warnings(),
    )
}
