//! Roofline csv output
//!
//! One `<model>_<kernel>.csv` per kernel, one row per memory level:
//! `intensity, GFLOP/s, intensity std dev, GFLOP/s std dev, label`.

use super::KernelIdentifiers;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use nvroof_shared::types::roofline::{RooflinePoint, RooflineSet};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write the roofline csv files, returning their paths
pub fn generate_roofline_csvs(
    rooflines: &RooflineSet,
    identifiers: &KernelIdentifiers,
    model_name: &str,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut by_file: IndexMap<String, Vec<&RooflinePoint>> = IndexMap::new();
    for point in rooflines.points() {
        by_file
            .entry(identifiers.get(&point.kernel))
            .or_default()
            .push(point);
    }

    let mut written = Vec::with_capacity(by_file.len());
    for (ident, points) in by_file {
        let output_path = output_dir.join(format!("{}_{}.csv", model_name, ident));
        info!("Generating roofline csv: {}", output_path.display());

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&output_path)
            .with_context(|| format!("Failed to create roofline file: {}", output_path.display()))?;

        for point in points {
            writer
                .serialize((
                    point.intensity_mean,
                    point.gflops(),
                    point.intensity_std_dev,
                    point.performance_std_dev / 1.0e9,
                    &point.memory_label,
                ))
                .with_context(|| format!("Failed to write roofline point for {}", point.kernel))?;
        }

        writer
            .flush()
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        written.push(output_path);
    }

    info!("Wrote {} roofline files", written.len());
    Ok(written)
}
