//! nvprof metric catalog
//!
//! Names of the hardware counters requested from nvprof and the rules used to
//! derive byte counts and combined metrics from them.

use indexmap::IndexMap;

/// Kernel execution time column of the gpu trace
pub const DURATION: &str = "Duration";

/// Hardware counters requested, one nvprof invocation each
pub const NVPROF_METRICS: &[&str] = &[
    "flop_count_dp",
    "flop_count_sp",
    "flop_count_hp",
    "gld_throughput",
    "gst_throughput",
    "local_load_throughput",
    "local_store_throughput",
    "shared_load_throughput",
    "shared_store_throughput",
    "l2_read_throughput",
    "l2_write_throughput",
    "dram_read_throughput",
    "dram_write_throughput",
];

/// Throughput metrics and the byte-count metrics derived from them
pub const THROUGHPUT_TO_COUNT: &[(&str, &str)] = &[
    ("gld_throughput", "gld_bytes"),
    ("gst_throughput", "gst_bytes"),
    ("g_throughput", "g_bytes"),
    ("local_load_throughput", "local_load_bytes"),
    ("local_store_throughput", "local_store_bytes"),
    ("local_throughput", "local_bytes"),
    ("shared_load_throughput", "shared_load_bytes"),
    ("shared_store_throughput", "shared_store_bytes"),
    ("shared_throughput", "shared_bytes"),
    ("l2_read_throughput", "l2_read_bytes"),
    ("l2_write_throughput", "l2_write_bytes"),
    ("l2_throughput", "l2_bytes"),
    ("dram_read_throughput", "dram_read_bytes"),
    ("dram_write_throughput", "dram_write_bytes"),
    ("dram_throughput", "dram_bytes"),
];

/// Combined metrics and their directional sources
pub const COMBINED_METRICS: &[(&str, &[&str])] = &[
    ("g_throughput", &["gld_throughput", "gst_throughput"]),
    ("local_throughput", &["local_load_throughput", "local_store_throughput"]),
    ("shared_throughput", &["shared_load_throughput", "shared_store_throughput"]),
    ("l2_throughput", &["l2_read_throughput", "l2_write_throughput"]),
    ("dram_throughput", &["dram_read_throughput", "dram_write_throughput"]),
];

/// Flop metrics in preference order, with their precision multipliers
pub const FLOP_METRICS: &[(&str, f64)] = &[
    ("flop_count_dp", 1.0),
    ("flop_count_sp", 2.0),
    ("flop_count_hp", 4.0),
];

/// Memory metrics a roofline point is computed against
pub const ROOFLINE_MEMORY_METRICS: &[&str] = &["shared_bytes", "l2_bytes", "dram_bytes"];

/// Metrics listed per kernel in the console report
pub const REPORT_METRICS: &[&str] = &[
    "flop_count_dp",
    "flop_count_sp",
    "flop_count_hp",
    "gld_throughput",
    "gst_throughput",
    "g_throughput",
    "g_bytes",
    "local_load_throughput",
    "local_store_throughput",
    "local_throughput",
    "local_bytes",
    "shared_load_throughput",
    "shared_store_throughput",
    "shared_throughput",
    "shared_bytes",
    "l2_read_throughput",
    "l2_write_throughput",
    "l2_throughput",
    "l2_bytes",
    "dram_read_throughput",
    "dram_write_throughput",
    "dram_throughput",
    "dram_bytes",
];

/// Human readable name of a metric
pub fn display_name(metric: &str) -> Option<&'static str> {
    let name = match metric {
        "flop_count_dp" => "dp flops",
        "flop_count_sp" => "sp flops",
        "flop_count_hp" => "hp flops",
        "gld_throughput" => "global load throughput",
        "gst_throughput" => "global store throughput",
        "g_throughput" => "global memory throughput",
        "local_load_throughput" => "local load throughput",
        "local_store_throughput" => "local store throughput",
        "local_throughput" => "local memory throughput",
        "shared_load_throughput" => "shared load throughput",
        "shared_store_throughput" => "shared store throughput",
        "shared_throughput" => "shared memory throughput",
        "l2_read_throughput" => "l2 read throughput",
        "l2_write_throughput" => "l2 write throughput",
        "l2_throughput" => "l2 memory throughput",
        "dram_read_throughput" => "memory read throughput",
        "dram_write_throughput" => "memory write throughput",
        "dram_throughput" => "memory throughput",
        "gld_bytes" => "global loads",
        "gst_bytes" => "global stores",
        "g_bytes" => "global memory",
        "local_load_bytes" => "local loads",
        "local_store_bytes" => "local stores",
        "local_bytes" => "local memory",
        "shared_load_bytes" => "shared loads",
        "shared_store_bytes" => "shared stores",
        "shared_bytes" => "shared memory",
        "l2_read_bytes" => "l2 reads",
        "l2_write_bytes" => "l2 writes",
        "l2_bytes" => "l2 memory",
        "dram_read_bytes" => "memory reads",
        "dram_write_bytes" => "memory writes",
        "dram_bytes" => "memory",
        _ => return None,
    };
    Some(name)
}

/// Whether a metric is a throughput (bytes/second) rather than a count
pub fn is_throughput(metric: &str) -> bool {
    metric.ends_with("_throughput")
}

/// Rules applied by the derived metric synthesizer
#[derive(Debug, Clone, PartialEq)]
pub struct DerivationRules {
    /// Ordered (throughput metric, count metric) pairs
    pub throughput_to_count: Vec<(String, String)>,

    /// Combined metric -> ordered source metrics
    pub combined: IndexMap<String, Vec<String>>,
}

impl DerivationRules {
    /// Rules with no conversions and no combinations
    pub fn empty() -> Self {
        Self {
            throughput_to_count: Vec::new(),
            combined: IndexMap::new(),
        }
    }

    pub fn with_conversion(mut self, throughput: &str, count: &str) -> Self {
        self.throughput_to_count
            .push((throughput.to_string(), count.to_string()));
        self
    }

    pub fn with_combination(mut self, combined: &str, sources: &[&str]) -> Self {
        self.combined.insert(
            combined.to_string(),
            sources.iter().map(|s| s.to_string()).collect(),
        );
        self
    }
}

impl Default for DerivationRules {
    fn default() -> Self {
        let rules = THROUGHPUT_TO_COUNT
            .iter()
            .fold(Self::empty(), |rules, (t, c)| rules.with_conversion(t, c));
        COMBINED_METRICS
            .iter()
            .fold(rules, |rules, (name, sources)| rules.with_combination(name, sources))
    }
}
