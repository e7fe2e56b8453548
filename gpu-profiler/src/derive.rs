//! Derived metrics
//!
//! Adds metrics nvprof does not report directly: combined throughputs summed
//! from their directional sources (`dram_throughput` from read + write) and
//! byte counts from throughput x duration (`dram_bytes`). Combination runs
//! first so combined throughputs get converted to combined counts too.
//!
//! Conversions need the kernel's `Duration` aligned with the throughput
//! samples. When `Duration` was recorded in the same pass as a sample, the
//! same (pass, run) is used. Otherwise samples are aligned by position,
//! which is only correct if every pass profiled the same launches in the
//! same order; callers are responsible for that.

use crate::error::DataError;
use crate::metrics::{DerivationRules, DURATION};
use indexmap::IndexMap;
use nvroof_shared::types::table::{KernelRecord, MetricSeries, MetricTable, Sample, Value};
use tracing::{debug, info};

/// Add combined and converted metrics to every kernel of `table`
pub fn synthesize(table: &mut MetricTable, rules: &DerivationRules) -> Result<(), DataError> {
    combine_metrics(table, &rules.combined)?;
    convert_throughputs(table, &rules.throughput_to_count)
}

/// Sum directional metrics into combined ones.
///
/// A combined metric is only added to a kernel that has every source
/// metric with at least as many runs as the first source.
pub fn combine_metrics(
    table: &mut MetricTable,
    combined: &IndexMap<String, Vec<String>>,
) -> Result<(), DataError> {
    for (combined_name, sources) in combined {
        let Some(lead) = sources.first() else {
            continue;
        };

        for (kernel, record) in table.kernels_mut() {
            let Some(lead_series) = record.get(lead) else {
                continue;
            };
            debug!("Combining metrics for kernel {}", kernel);

            if let Some(missing) = sources.iter().find(|s| !record.contains(s)) {
                info!(
                    "Source metric {} missing for combined metric {} in kernel {}, combined metric will not be added",
                    missing, combined_name, kernel
                );
                continue;
            }

            let runs = lead_series.len();
            if let Some(short) = sources
                .iter()
                .find(|s| record.get(s).map_or(0, MetricSeries::len) < runs)
            {
                info!(
                    "Source metric {} has fewer runs than {} in kernel {}, {} will not be added",
                    short, lead, kernel, combined_name
                );
                continue;
            }

            let mut samples = Vec::with_capacity(runs);
            for (index, lead_sample) in lead_series.samples().iter().enumerate() {
                let mut total = 0.0;
                for source in sources {
                    total += numeric_at(kernel, record, source, index)?;
                }
                samples.push(Sample {
                    pass: lead_sample.pass,
                    run: lead_sample.run,
                    value: Value::Number(total),
                });
            }

            record.insert(combined_name.clone(), MetricSeries::from_samples(samples));
        }
    }

    Ok(())
}

/// Convert throughput metrics to byte counts: `count[i] = throughput[i] * duration[i]`
pub fn convert_throughputs(
    table: &mut MetricTable,
    pairs: &[(String, String)],
) -> Result<(), DataError> {
    for (throughput, count) in pairs {
        for (kernel, record) in table.kernels_mut() {
            let Some(series) = record.get(throughput) else {
                continue;
            };
            debug!("Generating count metric {} for {} in kernel {}", count, throughput, kernel);

            let mut samples = Vec::with_capacity(series.len());
            for (index, sample) in series.samples().iter().enumerate() {
                let rate = numeric(kernel, throughput, sample)?;
                let duration = aligned_duration(kernel, record, sample, index)?;
                samples.push(Sample {
                    pass: sample.pass,
                    run: sample.run,
                    value: Value::Number(rate * duration),
                });
            }

            record.insert(count.clone(), MetricSeries::from_samples(samples));
        }
    }

    Ok(())
}

/// Duration of the launch that produced `sample`, the `index`-th sample of
/// its series
pub(crate) fn aligned_duration(
    kernel: &str,
    record: &KernelRecord,
    sample: &Sample,
    index: usize,
) -> Result<f64, DataError> {
    let duration = record.get(DURATION).ok_or_else(|| DataError::MissingMetric {
        kernel: kernel.to_string(),
        metric: DURATION.to_string(),
    })?;

    let value = if duration.has_pass(sample.pass) {
        duration.get(sample.pass, sample.run)
    } else {
        debug!(
            "No {} in pass {} for kernel {}, aligning run {} by position",
            DURATION, sample.pass, kernel, index
        );
        duration.value_at(index)
    };

    let value = value.ok_or_else(|| DataError::MisalignedSeries {
        kernel: kernel.to_string(),
        metric: DURATION.to_string(),
        index,
    })?;

    value.as_f64().ok_or_else(|| DataError::NonNumeric {
        kernel: kernel.to_string(),
        metric: DURATION.to_string(),
        run: index,
        value: value.to_string(),
    })
}

/// Numeric value of the `index`-th sample of `metric`
pub(crate) fn numeric_at(
    kernel: &str,
    record: &KernelRecord,
    metric: &str,
    index: usize,
) -> Result<f64, DataError> {
    let sample = record
        .get(metric)
        .and_then(|s| s.samples().get(index))
        .ok_or_else(|| DataError::MisalignedSeries {
            kernel: kernel.to_string(),
            metric: metric.to_string(),
            index,
        })?;
    numeric(kernel, metric, sample)
}

fn numeric(kernel: &str, metric: &str, sample: &Sample) -> Result<f64, DataError> {
    sample.value.as_f64().ok_or_else(|| DataError::NonNumeric {
        kernel: kernel.to_string(),
        metric: metric.to_string(),
        run: sample.run,
        value: sample.value.to_string(),
    })
}
