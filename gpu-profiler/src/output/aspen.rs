//! Aspen model output
//!
//! Writes a `<model>.aspen` performance model with one kernel block per
//! profiled kernel, using the measured flop and byte counts.

use super::{is_library_call, KernelIdentifiers};
use crate::metrics::DURATION;
use anyhow::{Context, Result};
use nvroof_shared::types::roofline::RooflineSet;
use nvroof_shared::types::table::{KernelRecord, MetricTable};
use nvroof_shared::utils::mean;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Flop metrics and their Aspen qualifier
const ASPEN_FLOPS: &[(&str, &str)] = &[("flop_count_dp", "as dp"), ("flop_count_sp", "as sp")];

/// Byte count metrics and the Aspen resource they map to
const ASPEN_MEMORY: &[(&str, &str)] = &[
    ("dram_read_bytes", "loads"),
    ("dram_write_bytes", "stores"),
    ("l2_read_bytes", "loads_l2"),
    ("l2_write_bytes", "stores_l2"),
    ("shared_load_bytes", "loads_shared"),
    ("shared_store_bytes", "stores_shared"),
];

/// Render the Aspen model of a session
pub fn render_aspen_model(
    table: &MetricTable,
    model_name: &str,
    rooflines: Option<&RooflineSet>,
) -> Result<String> {
    if model_name.trim().is_empty() {
        anyhow::bail!("The model name can't be blank");
    }

    let mut out = String::new();
    writeln!(out, "// Aspen file generated automatically using cuda roofline tool")?;
    writeln!(out, "// All kernels have exact counts from profiling")?;
    writeln!(out, "// This model needs to know the number of processors to run on")?;
    writeln!(out, "\n")?;

    writeln!(out, "model {} {{", model_name)?;
    writeln!(out, "\tparam numThreads = numProcessors")?;

    let identifiers = KernelIdentifiers::from_table(table);
    let kernels: Vec<(&str, &KernelRecord)> = table
        .kernels()
        .filter(|(kernel, _)| !is_library_call(kernel))
        .collect();

    for (kernel, record) in &kernels {
        let ident = identifiers.get(kernel);

        if let Some(duration) = metric_mean(kernel, record, DURATION) {
            writeln!(out, "\t// kernel {} average exec time {}", ident, duration)?;
        }

        if let Some(rooflines) = rooflines {
            let mut points = rooflines.for_kernel(kernel).peekable();
            if points.peek().is_some() {
                writeln!(out, "\t// roofline points")?;
            }
            for point in points {
                writeln!(
                    out,
                    "\t// {} flops/byte {}  gflops {}",
                    point.memory_label,
                    point.intensity_mean,
                    point.gflops()
                )?;
            }
        }

        writeln!(out, "\tkernel {} {{", ident)?;
        writeln!(out, "\t\texecute [ {} ] {{", record.call_count())?;

        for (metric, qualifier) in ASPEN_FLOPS {
            if let Some(flops) = metric_mean(kernel, record, metric) {
                writeln!(out, "\t\t\tflops [ {} / numThreads ] {}", flops, qualifier)?;
            }
        }

        writeln!(out)?;

        for (metric, resource) in ASPEN_MEMORY {
            if let Some(bytes) = metric_mean(kernel, record, metric) {
                writeln!(out, "\t\t\t{} [ {} / numThreads ]", resource, bytes)?;
            }
        }

        writeln!(out, "\t\t}}")?;
        writeln!(out, "\t}}\n")?;
    }

    writeln!(out, "\tkernel main {{")?;
    for (kernel, _) in &kernels {
        writeln!(out, "\t\tcall {}()", identifiers.get(kernel))?;
    }
    writeln!(out, "\t}}")?;
    writeln!(out, "}}")?;

    Ok(out)
}

/// Write `<output_dir>/<model_name>.aspen`
pub fn generate_aspen_model(
    table: &MetricTable,
    model_name: &str,
    rooflines: Option<&RooflineSet>,
    output_dir: &Path,
) -> Result<PathBuf> {
    let model = render_aspen_model(table, model_name, rooflines)?;
    let output_path = output_dir.join(format!("{}.aspen", model_name));
    info!("Generating Aspen model: {}", output_path.display());

    std::fs::write(&output_path, model)
        .with_context(|| format!("Failed to write Aspen model: {}", output_path.display()))?;

    info!("Aspen model written to {}", output_path.display());
    Ok(output_path)
}

fn metric_mean(kernel: &str, record: &KernelRecord, metric: &str) -> Option<f64> {
    let series = record.get(metric)?;
    match series.numbers() {
        Some(values) => mean(&values),
        None => {
            warn!("{} of kernel {} is not numeric, leaving it out of the model", metric, kernel);
            None
        }
    }
}
