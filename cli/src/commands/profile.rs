//! Profile command implementation

use super::OutputArgs;
use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use nvroof_gpu::output::default_model_name;
use nvroof_gpu::{ProcessRunner, ProfileSession};
use std::path::Path;
use tracing::info;

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Name of the Aspen model (defaults to the program's file name)
    #[arg(short, long)]
    pub model_name: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Program to profile, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

pub fn run(args: ProfileArgs) -> Result<()> {
    let config = args.output.load_config()?;

    let model_name = match &args.model_name {
        Some(name) => name.clone(),
        None => args
            .command
            .first()
            .and_then(|program| default_model_name(Path::new(program)))
            .context("Cannot derive a model name from the program, use --model-name")?,
    };

    let runner = ProcessRunner;
    let session = ProfileSession::new(&config, &runner, args.command.clone());
    let passes = session.passes();
    info!("Profiling {} with {} nvprof passes", model_name, passes.len());

    let progress = create_progress_bar(passes.len() as u64);
    let mut resolver = session.resolver();
    let table = session
        .collect(&mut resolver, |index, pass| {
            progress.set_position(index as u64);
            progress.set_message(pass.kind.to_string());
        })
        .context("Profiling failed")?;
    progress.finish_with_message("done");

    super::finish(table, model_name, &config, &args.output, resolver.warnings())
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} passes ({msg})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    pb
}
