//! Subcommand implementations

pub mod analyze;
pub mod profile;

use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use nvroof_gpu::output::{render_report, write_outputs, OutputOptions};
use nvroof_gpu::{analyze_table, DemangleWarning, DerivationRules, ProfileConfig};
use nvroof_shared::types::table::MetricTable;
use std::path::PathBuf;

/// Options shared by every command producing a model
#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for the model and roofline files (overrides the configuration)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Also output the metric table and roofline points in JSON format
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl OutputArgs {
    /// Configuration with command line overrides applied
    pub fn load_config(&self) -> Result<ProfileConfig> {
        let mut config = ProfileConfig::load(self.config.as_deref())?;
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        Ok(config)
    }
}

/// Derive metrics, compute rooflines, write every output and print the report
pub fn finish(
    mut table: MetricTable,
    model_name: String,
    config: &ProfileConfig,
    args: &OutputArgs,
    warnings: &[DemangleWarning],
) -> Result<()> {
    output::demangle_warnings(warnings);

    if table.is_empty() {
        output::warning("No kernels found in profiler output");
    }

    let rooflines = analyze_table(&mut table, &DerivationRules::default())
        .context("Failed to analyze profile data")?;

    print!("{}", render_report(&table, &rooflines)?);

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;

    let options = OutputOptions {
        model_name,
        output_dir: config.output_dir.clone(),
        json_path: args.json.clone(),
    };
    let written = write_outputs(&table, &rooflines, &options)?;

    output::written_files(&written);

    Ok(())
}
