//! Console report

use crate::metrics::{display_name, is_throughput, DURATION, REPORT_METRICS};
use nvroof_shared::types::roofline::RooflineSet;
use nvroof_shared::types::table::MetricTable;
use anyhow::Result;
use nvroof_shared::utils::{format_seconds, format_units, mean};
use std::fmt::Write as _;

/// Human readable summary: kernel list, per-kernel metric means and
/// roofline points
pub fn render_report(table: &MetricTable, rooflines: &RooflineSet) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "List of kernels")?;
    for kernel in table.kernel_names() {
        writeln!(out, "{}", kernel)?;
    }

    for (kernel, record) in table.kernels() {
        writeln!(out)?;
        match series_mean(table, kernel, DURATION) {
            Some(duration) => writeln!(
                out,
                "Kernel {} Duration {}",
                kernel,
                format_seconds(duration)
            )?,
            None => writeln!(out, "Kernel {}", kernel)?,
        }
        writeln!(out, "  calls {}", record.call_count())?;

        for &metric in REPORT_METRICS {
            let Some(value) = series_mean(table, kernel, metric) else {
                continue;
            };
            let label = display_name(metric).unwrap_or(metric);
            writeln!(out, "  {:<28} {}", label, format_units(value, false, unit(metric)))?;
        }
    }

    if !rooflines.is_empty() {
        writeln!(out)?;
        writeln!(out, "Roofline points")?;
        for point in rooflines.points() {
            writeln!(
                out,
                "{} {}  {}  flops/byte  {}  flops/sec",
                point.memory_label, point.kernel, point.intensity_mean, point.performance_mean
            )?;
        }
    }

    Ok(out)
}

fn series_mean(table: &MetricTable, kernel: &str, metric: &str) -> Option<f64> {
    mean(&table.get(kernel)?.get(metric)?.numbers()?)
}

fn unit(metric: &str) -> &'static str {
    if is_throughput(metric) {
        "B/s"
    } else if metric.ends_with("_bytes") {
        "B"
    } else {
        "flops"
    }
}
