//! Output generation
//!
//! Writers for the results of a session: the Aspen performance model,
//! per-kernel roofline csv files, a JSON export and the console report.

pub mod aspen;
pub mod json;
pub mod report;
pub mod rooflines;

pub use aspen::{generate_aspen_model, render_aspen_model};
pub use json::generate_json;
pub use report::render_report;
pub use rooflines::generate_roofline_csvs;

use crate::symbols::canonical_kernel_name;
use anyhow::Result;
use nvroof_shared::types::roofline::RooflineSet;
use nvroof_shared::types::table::MetricTable;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::warn;

static TYPE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(void|bool|char|short|int|long|float|double|unsigned|signed|const)\b").unwrap()
});

static NON_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

/// Whether a kernel entry is a runtime operation (`[CUDA memcpy HtoD]`)
/// rather than a user kernel
pub fn is_library_call(kernel: &str) -> bool {
    kernel.starts_with('[')
}

/// Identifier form of a kernel name, usable in model files and file names.
///
/// `void sgemm<float>(float const*, float*)` becomes `sgemm`.
pub fn format_kernel(kernel: &str) -> String {
    let name = canonical_kernel_name(kernel);
    let name = TYPE_KEYWORDS.replace_all(&name, "");
    let name = NON_IDENT.replace_all(&name, "_");
    let name = UNDERSCORES.replace_all(&name, "_");
    let name = name.trim_matches('_');

    if name.is_empty() {
        "kernel".to_string()
    } else {
        name.to_string()
    }
}

/// Unique identifier per kernel, assigned in table order.
///
/// Kernels whose names only differ in what `format_kernel` strips
/// (`sgemm<float>`, `sgemm<double>`) get `_2`, `_3`, ... suffixes after the
/// first one.
#[derive(Debug, Clone, Default)]
pub struct KernelIdentifiers {
    idents: HashMap<String, String>,
}

impl KernelIdentifiers {
    pub fn new<'a>(kernels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut idents = HashMap::new();
        let mut taken = HashSet::new();

        for kernel in kernels {
            if idents.contains_key(kernel) {
                continue;
            }
            let base = format_kernel(kernel);
            let mut ident = base.clone();
            let mut suffix = 1;
            while !taken.insert(ident.clone()) {
                suffix += 1;
                ident = format!("{}_{}", base, suffix);
            }
            if suffix > 1 {
                warn!(
                    "Kernel {} maps to identifier {} already in use, renamed to {}",
                    kernel, base, ident
                );
            }
            idents.insert(kernel.to_string(), ident);
        }

        Self { idents }
    }

    /// Identifiers for every kernel of `table`
    pub fn from_table(table: &MetricTable) -> Self {
        Self::new(table.kernel_names())
    }

    /// Identifier of `kernel`; kernels not seen at construction get their
    /// plain formatted name
    pub fn get(&self, kernel: &str) -> String {
        self.idents
            .get(kernel)
            .cloned()
            .unwrap_or_else(|| format_kernel(kernel))
    }
}

/// Where and under which name session results are written
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub model_name: String,
    pub output_dir: PathBuf,
    pub json_path: Option<PathBuf>,
}

/// Files produced by `write_outputs`
#[derive(Debug, Clone, Default)]
pub struct WrittenFiles {
    pub model: PathBuf,
    pub rooflines: Vec<PathBuf>,
    pub json: Option<PathBuf>,
}

/// Write the Aspen model, the roofline csv files and, if requested, the JSON export
pub fn write_outputs(
    table: &MetricTable,
    rooflines: &RooflineSet,
    options: &OutputOptions,
) -> Result<WrittenFiles> {
    let model = generate_aspen_model(
        table,
        &options.model_name,
        Some(rooflines),
        &options.output_dir,
    )?;
    let roofline_files = generate_roofline_csvs(
        rooflines,
        &KernelIdentifiers::from_table(table),
        &options.model_name,
        &options.output_dir,
    )?;

    let json = match &options.json_path {
        Some(path) => {
            generate_json(table, rooflines, &options.model_name, path)?;
            Some(path.clone())
        }
        None => None,
    };

    Ok(WrittenFiles {
        model,
        rooflines: roofline_files,
        json,
    })
}

/// Model name for a profiled program: its file name
pub fn default_model_name(program: &Path) -> Option<String> {
    program
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}
