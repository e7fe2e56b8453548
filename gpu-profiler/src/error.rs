//! Error types for the profiling pipeline

use std::io;

/// Fatal errors of a profiling session
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// An external tool (profiler or demangler) exited non-zero
    #[error("`{command}` exited with status {code}: {stderr}")]
    ExternalTool {
        command: String,
        code: i32,
        stderr: String,
    },

    /// An external tool could not be started
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Profiler output could not be turned into a metric table
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Malformed or inconsistent profiler data
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("no profiler output to parse")]
    EmptyInput,

    #[error("unable to find kernel name column in csv data: {columns:?}")]
    MissingKernelColumn { columns: Vec<String> },

    #[error("malformed csv data: {0}")]
    Csv(String),

    #[error("kernel `{kernel}` has no `{metric}` metric")]
    MissingMetric { kernel: String, metric: String },

    #[error("metric `{metric}` of kernel `{kernel}` has non-numeric value {value:?} at run {run}")]
    NonNumeric {
        kernel: String,
        metric: String,
        run: usize,
        value: String,
    },

    #[error("metric `{metric}` of kernel `{kernel}` has no sample aligned with run {index}")]
    MisalignedSeries {
        kernel: String,
        metric: String,
        index: usize,
    },
}

impl From<csv::Error> for DataError {
    fn from(e: csv::Error) -> Self {
        DataError::Csv(e.to_string())
    }
}

impl From<csv::Error> for ProfileError {
    fn from(e: csv::Error) -> Self {
        ProfileError::Data(e.into())
    }
}

pub type Result<T, E = ProfileError> = std::result::Result<T, E>;
