//! Console status lines for nvroof commands

use colored::Colorize;
use nvroof_gpu::output::WrittenFiles;
use nvroof_gpu::DemangleWarning;

/// Print success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Summarize kernel names the demangler could not handle, one line each
pub fn demangle_warnings(warnings: &[DemangleWarning]) {
    if warnings.is_empty() {
        return;
    }

    warning(&format!(
        "{} could not be demangled, mangled names are used instead",
        count_noun(warnings.len(), "kernel name")
    ));
    for w in warnings {
        println!("    {}", w.to_string().dimmed());
    }
}

/// List the files a session produced
pub fn written_files(written: &WrittenFiles) {
    success(&format!("Aspen model written to {}", written.model.display()));

    match written.rooflines.len() {
        0 => info("No roofline points to write"),
        n => info(&format!(
            "{} written to {}",
            count_noun(n, "roofline file"),
            written
                .model
                .parent()
                .map_or_else(|| ".".into(), |dir| dir.display().to_string())
        )),
    }
    for path in &written.rooflines {
        println!("    {}", path.display());
    }

    if let Some(path) = &written.json {
        info(&format!("JSON output written to {}", path.display()));
    }
}

/// `1 kernel name`, `3 kernel names`
fn count_noun(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
