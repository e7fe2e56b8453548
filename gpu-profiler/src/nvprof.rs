//! nvprof CSV ingestion
//!
//! nvprof writes its `--csv` report to stderr, after a preamble of `==PID==`
//! lines. The table starts after the `==PID== Profiling result:` marker with
//! a header row, then a row of unit labels, then one row per kernel launch.

use crate::error::{DataError, Result};
use crate::symbols::ResolveName;
use nvroof_shared::types::table::{MetricTable, Value};
use nvroof_shared::utils::normalize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Columns that may hold the kernel name, in order of preference
const KERNEL_COLUMNS: &[&str] = &["Kernel", "Name"];

/// Whether `line` is the marker preceding the csv header
pub fn is_result_marker(line: &str) -> bool {
    line.contains("==") && line.contains("result:")
}

/// Ingest one pass of nvprof output into `table`.
///
/// Samples are appended to the kernel's existing series, so calling this
/// once per profiler invocation accumulates the whole session. Output
/// without a result marker, or without any kernel rows, leaves `table`
/// untouched. Columns named in `ignore` are dropped.
pub fn ingest<S: AsRef<str>>(
    lines: &[S],
    table: &mut MetricTable,
    ignore: &HashSet<String>,
    resolver: &mut dyn ResolveName,
) -> Result<()> {
    if lines.is_empty() {
        return Err(DataError::EmptyInput.into());
    }

    let Some(start) = lines.iter().position(|line| {
        let line = line.as_ref();
        let found = is_result_marker(line);
        if !found {
            debug!("Consuming non-data line: {}", line);
        }
        found
    }) else {
        debug!("No profiling result in output, nothing to ingest");
        return Ok(());
    };

    info!("Reached nvprof data");

    let data = lines[start + 1..]
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join("\n");

    let rows = parse_rows(&data, ignore, resolver)?;
    if rows.is_empty() {
        debug!("No kernel rows in this pass");
        return Ok(());
    }

    let pass = table.commit_pass();
    let row_count = rows.len();
    for (kernel, values) in rows {
        let record = table.kernel_mut(&kernel);
        for (column, value) in values {
            record.push(&column, pass, value);
        }
    }

    table.refresh_call_counts();
    for (kernel, record) in table.kernels() {
        debug!("Callcount for {}: {:5}", kernel, record.call_count());
    }

    info!("Ingested {} kernel rows from pass {}", row_count, pass);
    Ok(())
}

/// One kernel row: canonical name and its normalized (column, value) pairs
type Row = (String, Vec<(String, Value)>);

/// Parse the csv table following the result marker
fn parse_rows(
    data: &str,
    ignore: &HashSet<String>,
    resolver: &mut dyn ResolveName,
) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(data.as_bytes());

    let headers = reader.headers()?.clone();
    debug!("header: {:?}", headers);

    let mut records = reader.records();
    let units = match records.next() {
        Some(units) => units?,
        None => return Ok(Vec::new()),
    };

    let mut kernel_column = None;
    let mut rows = Vec::new();

    for record in records {
        let record = record?;
        debug!("Processing row {:?}", record);

        let kernel_idx = match kernel_column {
            Some(idx) => idx,
            None => {
                let idx = find_kernel_column(&headers)?;
                kernel_column = Some(idx);
                idx
            }
        };

        let kernel = resolver.resolve(record.get(kernel_idx).unwrap_or(""))?;
        if kernel.is_empty() {
            debug!("Skipping row without kernel name");
            continue;
        }

        let values = headers
            .iter()
            .enumerate()
            .filter(|(idx, column)| *idx != kernel_idx && !ignore.contains(*column))
            .map(|(idx, column)| {
                let raw = record.get(idx).unwrap_or("");
                let unit = units.get(idx).unwrap_or("");
                (column.to_string(), normalize(raw, unit))
            })
            .collect();

        rows.push((kernel, values));
    }

    Ok(rows)
}

fn find_kernel_column(headers: &csv::StringRecord) -> Result<usize, DataError> {
    KERNEL_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h == *name))
        .ok_or_else(|| DataError::MissingKernelColumn {
            columns: headers.iter().map(str::to_string).collect(),
        })
}
