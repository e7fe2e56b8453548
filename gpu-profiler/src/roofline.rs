//! Roofline analysis
//!
//! For each kernel, picks the flop metric with the largest precision-scaled
//! mean and computes achieved performance (flops / duration) once per run.
//! Arithmetic intensity (flops / bytes) is then computed against each
//! memory level; every point of a kernel shares the same performance.
//!
//! Runs with a zero (or non-finite) duration are left out of performance,
//! runs with a zero (or non-finite) byte count are left out of that memory
//! level's intensity. Both are logged. A point with no usable intensity or
//! performance runs is not emitted.

use crate::derive::{aligned_duration, numeric_at};
use crate::error::DataError;
use crate::metrics::{display_name, FLOP_METRICS, ROOFLINE_MEMORY_METRICS};
use nvroof_shared::types::roofline::{RooflinePoint, RooflineSet};
use nvroof_shared::types::table::{KernelRecord, MetricTable};
use nvroof_shared::utils::{mean, std_dev};
use tracing::{debug, warn};

/// Compute roofline points for every kernel of a finalized table
pub fn analyze(table: &MetricTable) -> Result<RooflineSet, DataError> {
    let mut rooflines = RooflineSet::new();

    for (kernel, record) in table.kernels() {
        let Some(flop_metric) = select_flop_metric(kernel, record)? else {
            debug!("No flop metrics for kernel {}, skipping", kernel);
            continue;
        };
        debug!("Kernel {} uses {}", kernel, flop_metric);

        let flops = numbers(kernel, record, flop_metric)?;
        let performance = performance_series(kernel, record, flop_metric, &flops)?;
        let Some(performance_mean) = mean(&performance) else {
            warn!("No usable durations for kernel {}, no roofline points", kernel);
            continue;
        };
        let performance_std_dev = std_dev(&performance);

        for &memory_metric in ROOFLINE_MEMORY_METRICS {
            if !record.contains(memory_metric) {
                continue;
            }
            let label = display_name(memory_metric).unwrap_or(memory_metric);

            let intensity = intensity_series(kernel, record, memory_metric, &flops)?;
            let Some(intensity_mean) = mean(&intensity) else {
                warn!("No usable runs for {} roofline of kernel {}", label, kernel);
                continue;
            };

            rooflines.insert(RooflinePoint {
                kernel: kernel.to_string(),
                memory_metric: memory_metric.to_string(),
                memory_label: label.to_string(),
                flop_metric: flop_metric.to_string(),
                runs: intensity.len(),
                intensity_mean,
                performance_mean,
                intensity_std_dev: std_dev(&intensity),
                performance_std_dev,
            });
        }
    }

    Ok(rooflines)
}

/// Flop metric with the largest mean x precision multiplier; the first one
/// wins a tie
pub fn select_flop_metric(
    kernel: &str,
    record: &KernelRecord,
) -> Result<Option<&'static str>, DataError> {
    let mut best: Option<(&'static str, f64)> = None;

    for &(metric, multiplier) in FLOP_METRICS {
        if !record.contains(metric) {
            continue;
        }
        let Some(m) = mean(&numbers(kernel, record, metric)?) else {
            continue;
        };
        let scaled = m * multiplier;
        if best.map_or(true, |(_, top)| scaled > top) {
            best = Some((metric, scaled));
        }
    }

    Ok(best.map(|(metric, _)| metric))
}

/// Per-run flops/second over the runs with a usable duration
fn performance_series(
    kernel: &str,
    record: &KernelRecord,
    flop_metric: &str,
    flops: &[f64],
) -> Result<Vec<f64>, DataError> {
    let Some(series) = record.get(flop_metric) else {
        return Ok(Vec::new());
    };

    let mut performance = Vec::with_capacity(flops.len());
    for (index, (sample, flop_count)) in series.samples().iter().zip(flops).enumerate() {
        let duration = aligned_duration(kernel, record, sample, index)?;
        if duration > 0.0 && duration.is_finite() {
            performance.push(flop_count / duration);
        } else {
            warn!(
                "Kernel {} run {} has duration {}, leaving it out of the roofline",
                kernel, index, duration
            );
        }
    }
    Ok(performance)
}

/// Per-run flops/byte against `memory_metric`.
///
/// Flops and bytes come from different passes, so runs are paired by
/// position; a shorter memory series only covers its own runs.
fn intensity_series(
    kernel: &str,
    record: &KernelRecord,
    memory_metric: &str,
    flops: &[f64],
) -> Result<Vec<f64>, DataError> {
    let bytes = numbers(kernel, record, memory_metric)?;
    if bytes.len() != flops.len() {
        warn!(
            "Kernel {} has {} runs of {} but {} flop runs",
            kernel,
            bytes.len(),
            memory_metric,
            flops.len()
        );
    }

    let mut intensity = Vec::with_capacity(bytes.len());
    for (index, (flop_count, byte_count)) in flops.iter().zip(&bytes).enumerate() {
        if *byte_count == 0.0 || !byte_count.is_finite() {
            warn!(
                "Kernel {} run {} has {} = {}, leaving it out of the roofline",
                kernel, index, memory_metric, byte_count
            );
            continue;
        }
        intensity.push(flop_count / byte_count);
    }
    Ok(intensity)
}

fn numbers(kernel: &str, record: &KernelRecord, metric: &str) -> Result<Vec<f64>, DataError> {
    let len = record.get(metric).map_or(0, |s| s.len());
    (0..len).map(|i| numeric_at(kernel, record, metric, i)).collect()
}
