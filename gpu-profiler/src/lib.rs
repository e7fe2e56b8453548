//! nvprof Roofline Profiling Library
//!
//! Collects per-kernel hardware counters from nvprof, derives byte counts
//! and combined throughputs, and computes roofline points.

pub mod config;
pub mod derive;
pub mod error;
pub mod metrics;
pub mod nvprof;
pub mod output;
pub mod roofline;
pub mod runner;
pub mod session;
pub mod symbols;

pub use config::ProfileConfig;
pub use error::{DataError, ProfileError, Result};
pub use metrics::DerivationRules;
pub use runner::{ExternalToolRunner, ProcessRunner, ToolOutput};
pub use session::{ingest_logs, name_resolver, PassKind, ProfilePass, ProfileSession};
pub use symbols::{CanonicalNames, DemangleWarning, NameResolver, ResolveName};

use nvroof_shared::types::roofline::RooflineSet;
use nvroof_shared::types::table::MetricTable;
use tracing::info;

/// Add derived metrics to `table`, then compute its roofline points
pub fn analyze_table(table: &mut MetricTable, rules: &DerivationRules) -> Result<RooflineSet> {
    derive::synthesize(table, rules)?;
    let rooflines = roofline::analyze(table)?;
    info!(
        "Computed {} roofline points for {} kernels",
        rooflines.len(),
        table.len()
    );
    Ok(rooflines)
}
