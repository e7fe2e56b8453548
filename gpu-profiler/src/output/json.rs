//! JSON output
//!
//! Exports the metric table and roofline points for further analysis

use anyhow::{Context, Result};
use nvroof_shared::types::roofline::{RooflinePoint, RooflineSet};
use nvroof_shared::types::table::MetricTable;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
struct SessionExport<'a> {
    model: &'a str,
    generated_at: String,
    kernels: &'a MetricTable,
    rooflines: Vec<&'a RooflinePoint>,
}

/// Generate JSON output from a session's results
pub fn generate_json(
    table: &MetricTable,
    rooflines: &RooflineSet,
    model_name: &str,
    output_path: &Path,
) -> Result<()> {
    info!("Generating JSON output: {}", output_path.display());

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

    let writer = BufWriter::new(file);

    let export = SessionExport {
        model: model_name,
        generated_at: chrono::Utc::now().to_rfc3339(),
        kernels: table,
        rooflines: rooflines.points().collect(),
    };

    serde_json::to_writer_pretty(writer, &export)
        .context("Failed to serialize session to JSON")?;

    info!("JSON output written to {}", output_path.display());

    Ok(())
}
