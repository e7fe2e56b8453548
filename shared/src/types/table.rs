//! Per-kernel metric table
//!
//! These types hold the samples ingested from profiler output: one
//! `MetricSeries` per (kernel, metric) pair, grouped into a `KernelRecord`
//! per canonical kernel name, grouped into a `MetricTable` per session.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of one profiler invocation (CSV pass) within a session
pub type PassId = usize;

/// A normalized profiler value
///
/// Columns that do not parse as numbers (device names, memory kinds, ...)
/// are kept verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    /// Text view of the value, if it was not numeric
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Number(_) => None,
            Value::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// One sample of a metric, tagged with where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Pass (profiler invocation) the sample was read from
    pub pass: PassId,

    /// Run index within that pass
    pub run: usize,

    pub value: Value,
}

/// Run-ordered samples of one metric for one kernel
///
/// Keeps a (pass, run) -> position index next to the samples so appending
/// and per-launch lookups stay constant time on long traces. Serialized as
/// the plain sample list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Sample>", into = "Vec<Sample>")]
pub struct MetricSeries {
    samples: Vec<Sample>,
    runs_per_pass: HashMap<PassId, usize>,
    positions: HashMap<(PassId, usize), usize>,
}

impl MetricSeries {
    /// Create an empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from already tagged samples (derived metrics)
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        let mut series = Self {
            samples: Vec::with_capacity(samples.len()),
            ..Self::default()
        };
        for sample in samples {
            series.insert_sample(sample);
        }
        series
    }

    /// Append a sample read from `pass`; its run index is the number of
    /// samples this series already holds from the same pass.
    pub fn push(&mut self, pass: PassId, value: Value) {
        let run = self.runs_per_pass.get(&pass).copied().unwrap_or(0);
        self.insert_sample(Sample { pass, run, value });
    }

    fn insert_sample(&mut self, sample: Sample) {
        let runs = self.runs_per_pass.entry(sample.pass).or_insert(0);
        *runs = (*runs).max(sample.run + 1);
        self.positions
            .entry((sample.pass, sample.run))
            .or_insert(self.samples.len());
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Values in run order
    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.samples.iter().map(|s| &s.value)
    }

    /// Value at a position in run order
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.samples.get(index).map(|s| &s.value)
    }

    /// Value recorded for `run` of `pass`
    pub fn get(&self, pass: PassId, run: usize) -> Option<&Value> {
        self.positions
            .get(&(pass, run))
            .and_then(|&position| self.value_at(position))
    }

    /// Whether any sample came from `pass`
    pub fn has_pass(&self, pass: PassId) -> bool {
        self.runs_per_pass.contains_key(&pass)
    }

    /// All values as numbers, or `None` if any of them is text
    pub fn numbers(&self) -> Option<Vec<f64>> {
        self.values().map(Value::as_f64).collect()
    }
}

impl From<Vec<Sample>> for MetricSeries {
    fn from(samples: Vec<Sample>) -> Self {
        Self::from_samples(samples)
    }
}

impl From<MetricSeries> for Vec<Sample> {
    fn from(series: MetricSeries) -> Self {
        series.samples
    }
}

/// All metrics collected for one canonical kernel name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelRecord {
    metrics: IndexMap<String, MetricSeries>,
    call_count: usize,
}

impl KernelRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: &str) -> Option<&MetricSeries> {
        self.metrics.get(metric)
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.metrics.contains_key(metric)
    }

    /// Append one sample to `metric`, creating the series on first use
    pub fn push(&mut self, metric: &str, pass: PassId, value: Value) {
        if let Some(series) = self.metrics.get_mut(metric) {
            series.push(pass, value);
        } else {
            let mut series = MetricSeries::new();
            series.push(pass, value);
            self.metrics.insert(metric.to_string(), series);
        }
    }

    /// Insert or replace a whole series (used for derived metrics)
    pub fn insert(&mut self, metric: impl Into<String>, series: MetricSeries) {
        self.metrics.insert(metric.into(), series);
    }

    /// Metric names in first-seen order
    pub fn metric_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.metrics.keys().map(String::as_str)
    }

    pub fn metrics(&self) -> impl Iterator<Item = (&str, &MetricSeries)> + '_ {
        self.metrics.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn call_count(&self) -> usize {
        self.call_count
    }

    /// Set the call count from the first inserted series
    pub fn refresh_call_count(&mut self) {
        self.call_count = self.metrics.values().next().map_or(0, MetricSeries::len);
    }
}

/// Canonical kernel name -> collected metrics, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTable {
    kernels: IndexMap<String, KernelRecord>,
    passes: usize,
}

impl MetricTable {
    /// Create a fresh, empty table
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn get(&self, kernel: &str) -> Option<&KernelRecord> {
        self.kernels.get(kernel)
    }

    pub fn contains(&self, kernel: &str) -> bool {
        self.kernels.contains_key(kernel)
    }

    /// Record for `kernel`, created empty if not yet present
    pub fn kernel_mut(&mut self, kernel: &str) -> &mut KernelRecord {
        self.kernels.entry(kernel.to_string()).or_default()
    }

    pub fn kernels(&self) -> impl Iterator<Item = (&str, &KernelRecord)> + '_ {
        self.kernels.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn kernels_mut(&mut self) -> impl Iterator<Item = (&str, &mut KernelRecord)> + '_ {
        self.kernels.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn kernel_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.kernels.keys().map(String::as_str)
    }

    /// Id the next ingested pass will be tagged with
    pub fn next_pass(&self) -> PassId {
        self.passes
    }

    /// Number of passes that contributed samples
    pub fn pass_count(&self) -> usize {
        self.passes
    }

    /// Mark the pass returned by `next_pass` as consumed
    pub fn commit_pass(&mut self) -> PassId {
        let pass = self.passes;
        self.passes += 1;
        pass
    }

    /// Recompute every kernel's call count
    pub fn refresh_call_counts(&mut self) {
        for record in self.kernels.values_mut() {
            record.refresh_call_count();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_run_index_per_pass() {
        let mut series = MetricSeries::new();
        series.push(0, 1.0.into());
        series.push(0, 2.0.into());
        series.push(1, 3.0.into());

        assert_eq!(series.len(), 3);
        assert_eq!(series.get(0, 1), Some(&Value::Number(2.0)));
        assert_eq!(series.get(1, 0), Some(&Value::Number(3.0)));
        assert_eq!(series.get(1, 1), None);
        assert!(series.has_pass(1));
        assert!(!series.has_pass(2));
    }

    #[test]
    fn test_series_from_tagged_samples() {
        let series = MetricSeries::from_samples(vec![
            Sample { pass: 2, run: 0, value: 1.0.into() },
            Sample { pass: 2, run: 1, value: 2.0.into() },
        ]);
        assert_eq!(series.get(2, 1), Some(&Value::Number(2.0)));
        assert!(!series.has_pass(0));

        let mut series = series;
        series.push(2, 3.0.into());
        assert_eq!(series.samples()[2].run, 2);
    }

    #[test]
    fn test_series_serializes_as_sample_list() {
        let mut series = MetricSeries::new();
        series.push(1, 2.5.into());

        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"[{"pass":1,"run":0,"value":2.5}]"#);

        let back: MetricSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, series);
        assert_eq!(back.get(1, 0), Some(&Value::Number(2.5)));
    }

    #[test]
    fn test_long_series_lookups() {
        let mut series = MetricSeries::new();
        for i in 0..50_000 {
            series.push(0, (i as f64).into());
            series.push(1, ((2 * i) as f64).into());
        }

        assert_eq!(series.len(), 100_000);
        assert_eq!(series.get(1, 49_999), Some(&Value::Number(99_998.0)));
        assert_eq!(series.samples()[99_999].run, 49_999);
        assert!((0..50_000).all(|run| series.get(0, run).is_some()));
    }

    #[test]
    fn test_series_numbers_rejects_text() {
        let mut series = MetricSeries::new();
        series.push(0, 1.5.into());
        assert_eq!(series.numbers(), Some(vec![1.5]));

        series.push(0, "n/a".into());
        assert_eq!(series.numbers(), None);
    }

    #[test]
    fn test_call_count_uses_first_inserted_series() {
        let mut record = KernelRecord::new();
        record.push("Duration", 0, 1.0.into());
        record.push("Duration", 0, 1.0.into());
        record.push("flop_count_sp", 1, 10.0.into());
        record.refresh_call_count();

        assert_eq!(record.call_count(), 2);
        assert_eq!(record.metric_names().collect::<Vec<_>>(), vec!["Duration", "flop_count_sp"]);
    }

    #[test]
    fn test_table_keeps_first_seen_order() {
        let mut table = MetricTable::new();
        table.kernel_mut("b").push("Duration", 0, 1.0.into());
        table.kernel_mut("a").push("Duration", 0, 1.0.into());
        table.kernel_mut("b").push("Duration", 0, 2.0.into());

        assert_eq!(table.kernel_names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(table.get("b").unwrap().get("Duration").unwrap().len(), 2);
    }

    #[test]
    fn test_commit_pass() {
        let mut table = MetricTable::new();
        assert_eq!(table.next_pass(), 0);
        assert_eq!(table.commit_pass(), 0);
        assert_eq!(table.next_pass(), 1);
        assert_eq!(table.pass_count(), 1);
    }

    #[test]
    fn test_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![Value::Number(2.5), Value::from("Tesla")]).unwrap();
        assert_eq!(json, r#"[2.5,"Tesla"]"#);
    }
}
