//! Roofline points
//!
//! One point per (kernel, memory metric): arithmetic intensity against that
//! memory level and achieved flop rate, averaged over runs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Key of a roofline point
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RooflineKey {
    /// Canonical kernel name
    pub kernel: String,

    /// Display label of the memory metric (e.g. "l2 memory")
    pub memory_label: String,
}

impl RooflineKey {
    pub fn new(kernel: impl Into<String>, memory_label: impl Into<String>) -> Self {
        Self {
            kernel: kernel.into(),
            memory_label: memory_label.into(),
        }
    }
}

/// Aggregated roofline coordinates of one kernel against one memory level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RooflinePoint {
    pub kernel: String,

    /// Memory metric the intensity is computed against (e.g. `dram_bytes`)
    pub memory_metric: String,

    /// Display label of `memory_metric`
    pub memory_label: String,

    /// Flop metric selected for the kernel (e.g. `flop_count_sp`)
    pub flop_metric: String,

    /// Number of runs in the intensity series
    pub runs: usize,

    /// Mean arithmetic intensity (flops/byte)
    pub intensity_mean: f64,

    /// Mean achieved performance (flops/second)
    pub performance_mean: f64,

    /// Sample standard deviation of intensity, 0 with fewer than 2 runs
    pub intensity_std_dev: f64,

    /// Sample standard deviation of performance, 0 with fewer than 2 runs
    pub performance_std_dev: f64,
}

impl RooflinePoint {
    pub fn key(&self) -> RooflineKey {
        RooflineKey::new(self.kernel.clone(), self.memory_label.clone())
    }

    /// Mean performance in GFLOP/s
    pub fn gflops(&self) -> f64 {
        self.performance_mean / 1.0e9
    }
}

/// Roofline points of a session, in kernel order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RooflineSet {
    points: IndexMap<RooflineKey, RooflinePoint>,
}

impl RooflineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, point: RooflinePoint) {
        self.points.insert(point.key(), point);
    }

    pub fn get(&self, kernel: &str, memory_label: &str) -> Option<&RooflinePoint> {
        self.points.get(&RooflineKey::new(kernel, memory_label))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &RooflinePoint> + '_ {
        self.points.values()
    }

    /// Points belonging to one kernel
    pub fn for_kernel<'a>(&'a self, kernel: &'a str) -> impl Iterator<Item = &'a RooflinePoint> + 'a {
        self.points.values().filter(move |p| p.kernel == kernel)
    }
}
