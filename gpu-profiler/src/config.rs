//! Configuration for a profiling session

use crate::metrics::NVPROF_METRICS;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `NVROOF_NVPROF_PATH`
pub const ENV_PREFIX: &str = "NVROOF";

/// Profiling session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Profiler executable
    pub nvprof_path: String,

    /// Demangler command line, the symbol is appended as last argument.
    /// Empty selects the in-process demangler.
    pub demangler: Vec<String>,

    /// Let the profiler demangle kernel names itself
    pub profiler_demangling: bool,

    /// Hardware counters to collect, one profiler pass each
    pub metrics: Vec<String>,

    /// Columns dropped during ingestion
    pub ignore_columns: Vec<String>,

    /// Log and skip a metric pass whose output cannot be parsed
    /// instead of aborting the session
    pub skip_failed_passes: bool,

    /// Directory receiving the model and roofline files
    pub output_dir: PathBuf,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            nvprof_path: "nvprof".to_string(),
            demangler: vec!["c++filt".to_string()],
            profiler_demangling: true,
            metrics: NVPROF_METRICS.iter().map(|m| m.to_string()).collect(),
            ignore_columns: Vec::new(),
            skip_failed_passes: false,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ProfileConfig {
    /// Load defaults, then the optional TOML file, then `NVROOF_*` variables
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("demangler")
                .with_list_parse_key("metrics")
                .with_list_parse_key("ignore_columns"),
        );

        let config: Self = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Columns to drop, as the ingestor expects them
    pub fn ignore_set(&self) -> HashSet<String> {
        self.ignore_columns.iter().cloned().collect()
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.nvprof_path.trim().is_empty() {
            anyhow::bail!("Profiler path must not be empty");
        }

        if self.demangler.iter().any(|arg| arg.trim().is_empty()) {
            anyhow::bail!("Demangler command contains an empty argument");
        }

        let mut seen = HashSet::new();
        for metric in &self.metrics {
            if metric.trim().is_empty() {
                anyhow::bail!("Metric names must not be empty");
            }
            if !seen.insert(metric.as_str()) {
                anyhow::bail!("Metric {} is requested twice", metric);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ProfileConfig::default();
        assert_eq!(config.nvprof_path, "nvprof");
        assert_eq!(config.demangler, vec!["c++filt".to_string()]);
        assert_eq!(config.metrics.len(), 13);
        assert!(config.profiler_demangling);
        assert!(!config.skip_failed_passes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let empty_path = ProfileConfig {
            nvprof_path: " ".to_string(),
            ..Default::default()
        };
        assert!(empty_path.validate().is_err());

        let duplicate = ProfileConfig {
            metrics: vec!["gld_throughput".to_string(), "gld_throughput".to_string()],
            ..Default::default()
        };
        assert!(duplicate.validate().is_err());

        let blank_metric = ProfileConfig {
            metrics: vec![String::new()],
            ..Default::default()
        };
        assert!(blank_metric.validate().is_err());

        let builtin_demangler = ProfileConfig {
            demangler: Vec::new(),
            ..Default::default()
        };
        assert!(builtin_demangler.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
nvprof_path = "/usr/local/cuda/bin/nvprof"
metrics = ["flop_count_sp", "dram_read_throughput"]
ignore_columns = ["Device", "Context"]
skip_failed_passes = true
"#
        )
        .unwrap();

        let config = ProfileConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.nvprof_path, "/usr/local/cuda/bin/nvprof");
        assert_eq!(config.metrics.len(), 2);
        assert!(config.skip_failed_passes);
        assert!(config.ignore_set().contains("Context"));
        // untouched fields keep their defaults
        assert_eq!(config.demangler, vec!["c++filt".to_string()]);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "metrics = [\"a\", \"a\"]").unwrap();

        assert!(ProfileConfig::load(Some(file.path())).is_err());
    }
}
