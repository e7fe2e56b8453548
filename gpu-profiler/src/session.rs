//! Profiling session driver
//!
//! Runs the profiler once for a plain gpu trace and once per requested
//! metric, strictly one after the other, and ingests every pass into the
//! same freshly built table.

use crate::config::ProfileConfig;
use crate::error::{ProfileError, Result};
use crate::nvprof;
use crate::runner::{run_checked, ExternalToolRunner};
use crate::symbols::{NameResolver, ResolveName};
use anyhow::Context;
use nvroof_shared::types::table::MetricTable;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// What a profiler pass collects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassKind {
    /// Plain gpu trace, source of `Duration`
    Trace,

    /// One hardware counter
    Metric(String),
}

impl std::fmt::Display for PassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassKind::Trace => write!(f, "gpu trace"),
            PassKind::Metric(metric) => write!(f, "{}", metric),
        }
    }
}

/// One profiler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePass {
    pub kind: PassKind,
    pub command: Vec<String>,
}

/// Profiles one program with the configured profiler
pub struct ProfileSession<'a> {
    config: &'a ProfileConfig,
    runner: &'a dyn ExternalToolRunner,
    program: Vec<String>,
}

impl<'a> ProfileSession<'a> {
    /// `program` is the command line of the application to profile
    pub fn new(
        config: &'a ProfileConfig,
        runner: &'a dyn ExternalToolRunner,
        program: Vec<String>,
    ) -> Self {
        Self {
            config,
            runner,
            program,
        }
    }

    /// Name resolver using the configured demangler through this session's runner
    pub fn resolver(&self) -> NameResolver<'a> {
        name_resolver(self.config, self.runner)
    }

    /// Profiler passes in execution order
    pub fn passes(&self) -> Vec<ProfilePass> {
        let trace = ProfilePass {
            kind: PassKind::Trace,
            command: self.command_line(None),
        };

        std::iter::once(trace)
            .chain(self.config.metrics.iter().map(|metric| ProfilePass {
                kind: PassKind::Metric(metric.clone()),
                command: self.command_line(Some(metric)),
            }))
            .collect()
    }

    fn command_line(&self, metric: Option<&str>) -> Vec<String> {
        let mut command = vec![self.config.nvprof_path.clone()];
        if let Some(metric) = metric {
            command.push("--metrics".to_string());
            command.push(metric.to_string());
        }
        if !self.config.profiler_demangling {
            command.push("--demangling".to_string());
            command.push("off".to_string());
        }
        command.push("--print-gpu-trace".to_string());
        command.push("--csv".to_string());
        command.extend(self.program.iter().cloned());
        command
    }

    /// Run every pass and return the accumulated table.
    ///
    /// `on_pass` is called before each pass starts. A profiler exiting
    /// non-zero aborts the session.
    pub fn collect(
        &self,
        resolver: &mut dyn ResolveName,
        mut on_pass: impl FnMut(usize, &ProfilePass),
    ) -> Result<MetricTable> {
        info!("Command to profile: {}", self.program.join(" "));

        let ignore = self.config.ignore_set();
        let mut table = MetricTable::new();

        for (index, pass) in self.passes().iter().enumerate() {
            on_pass(index, pass);
            info!("nvprof command: {}", pass.command.join(" "));

            let output = run_checked(self.runner, &pass.command)?;
            let lines: Vec<&str> = output.stderr.lines().collect();

            ingest_pass(
                &lines,
                &mut table,
                &ignore,
                resolver,
                self.config.skip_failed_passes,
                &pass.kind.to_string(),
            )?;
        }

        info!(
            "Collected {} kernels over {} passes",
            table.len(),
            table.pass_count()
        );
        Ok(table)
    }
}

/// Resolver for `config`: external demangler, or in-process when none is configured
pub fn name_resolver<'a>(
    config: &ProfileConfig,
    runner: &'a dyn ExternalToolRunner,
) -> NameResolver<'a> {
    if config.demangler.is_empty() {
        NameResolver::builtin()
    } else {
        NameResolver::external(runner, config.demangler.clone())
    }
}

/// Ingest previously captured profiler logs, one file per pass, in order
pub fn ingest_logs<P: AsRef<Path>>(
    config: &ProfileConfig,
    paths: &[P],
    resolver: &mut dyn ResolveName,
) -> anyhow::Result<MetricTable> {
    let ignore = config.ignore_set();
    let mut table = MetricTable::new();

    for path in paths {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profiler log {}", path.display()))?;
        let lines: Vec<&str> = text.lines().collect();

        ingest_pass(
            &lines,
            &mut table,
            &ignore,
            resolver,
            config.skip_failed_passes,
            &path.display().to_string(),
        )
        .with_context(|| format!("Failed to ingest {}", path.display()))?;
    }

    Ok(table)
}

fn ingest_pass(
    lines: &[&str],
    table: &mut MetricTable,
    ignore: &HashSet<String>,
    resolver: &mut dyn ResolveName,
    skip_failed: bool,
    label: &str,
) -> Result<()> {
    match nvprof::ingest(lines, table, ignore, resolver) {
        Err(ProfileError::Data(err)) if skip_failed => {
            warn!("Skipping pass {}: {}", label, err);
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::runner::ToolOutput;
    use crate::symbols::CanonicalNames;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;

    /// Replays canned profiler outputs in order
    struct ScriptedProfiler {
        outputs: RefCell<VecDeque<ToolOutput>>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ScriptedProfiler {
        fn new(stderr: &[&str]) -> Self {
            Self {
                outputs: RefCell::new(
                    stderr
                        .iter()
                        .map(|s| ToolOutput {
                            stderr: s.to_string(),
                            ..Default::default()
                        })
                        .collect(),
                ),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ExternalToolRunner for ScriptedProfiler {
        fn run(&self, command: &[String]) -> io::Result<ToolOutput> {
            self.calls.borrow_mut().push(command.to_vec());
            self.outputs
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no more output"))
        }
    }

    const TRACE: &str = "==1== Profiling result:\n\"Duration\",\"Name\"\nus,\n2.0,\"k(int) [1]\"\n";
    const GLD: &str = "==1== Profiling result:\n\"Kernel\",\"gld_throughput\"\n,GB/s\n\"k(int)\",1.0\n";

    fn config(metrics: &[&str]) -> ProfileConfig {
        ProfileConfig {
            metrics: metrics.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    fn program() -> Vec<String> {
        vec!["./app".to_string(), "-n".to_string(), "4".to_string()]
    }

    #[test]
    fn test_pass_command_lines() {
        let config = config(&["gld_throughput"]);
        let runner = ScriptedProfiler::new(&[]);
        let session = ProfileSession::new(&config, &runner, program());

        let passes = session.passes();
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].kind, PassKind::Trace);
        assert_eq!(
            passes[0].command,
            vec!["nvprof", "--print-gpu-trace", "--csv", "./app", "-n", "4"]
        );
        assert_eq!(
            passes[1].command,
            vec!["nvprof", "--metrics", "gld_throughput", "--print-gpu-trace", "--csv", "./app", "-n", "4"]
        );
    }

    #[test]
    fn test_demangling_off() {
        let mut config = config(&[]);
        config.profiler_demangling = false;
        let runner = ScriptedProfiler::new(&[]);
        let session = ProfileSession::new(&config, &runner, program());

        let passes = session.passes();
        assert_eq!(&passes[0].command[1..3], &["--demangling", "off"]);
    }

    #[test]
    fn test_collect_runs_passes_in_order() {
        let config = config(&["gld_throughput"]);
        let runner = ScriptedProfiler::new(&[TRACE, GLD]);
        let session = ProfileSession::new(&config, &runner, program());

        let mut seen = Vec::new();
        let table = session
            .collect(&mut CanonicalNames, |index, pass| seen.push((index, pass.kind.clone())))
            .unwrap();

        assert_eq!(
            seen,
            vec![(0, PassKind::Trace), (1, PassKind::Metric("gld_throughput".to_string()))]
        );
        assert_eq!(runner.calls.borrow().len(), 2);

        let record = table.get("k").unwrap();
        assert!(record.contains("Duration"));
        assert_eq!(record.get("gld_throughput").unwrap().samples()[0].pass, 1);
        assert_eq!(table.pass_count(), 2);
    }

    #[test]
    fn test_profiler_failure_aborts() {
        let config = config(&["gld_throughput"]);
        let runner = ScriptedProfiler::new(&[TRACE]);
        runner.outputs.borrow_mut().push_back(ToolOutput {
            stderr: "======== Error: application not found".to_string(),
            exit_code: 1,
            ..Default::default()
        });
        let session = ProfileSession::new(&config, &runner, program());

        let err = session.collect(&mut CanonicalNames, |_, _| {}).unwrap_err();
        assert!(matches!(err, ProfileError::ExternalTool { code: 1, .. }));
    }

    #[test]
    fn test_failed_pass_is_fatal_by_default() {
        let config = config(&["gld_throughput"]);
        let broken = "==1== Profiling result:\n\"Device\",\"gld_throughput\"\n,GB/s\nK80,1.0\n";
        let runner = ScriptedProfiler::new(&[TRACE, broken]);
        let session = ProfileSession::new(&config, &runner, program());

        let err = session.collect(&mut CanonicalNames, |_, _| {}).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::Data(DataError::MissingKernelColumn { .. })
        ));
    }

    #[test]
    fn test_failed_pass_can_be_skipped() {
        let mut config = config(&["gld_throughput", "gst_throughput"]);
        config.skip_failed_passes = true;
        let gst = "==1== Profiling result:\n\"Kernel\",\"gst_throughput\"\n,GB/s\n\"k(int)\",3.0\n";
        let runner = ScriptedProfiler::new(&[TRACE, "", gst]);
        let session = ProfileSession::new(&config, &runner, program());

        let table = session.collect(&mut CanonicalNames, |_, _| {}).unwrap();
        let record = table.get("k").unwrap();
        assert!(!record.contains("gld_throughput"));
        assert!(record.contains("gst_throughput"));
    }

    #[test]
    fn test_ingest_logs() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("trace.log");
        let gld = dir.path().join("gld.log");
        std::fs::write(&trace, TRACE).unwrap();
        std::fs::write(&gld, GLD).unwrap();

        let table = ingest_logs(&config(&[]), &[&trace, &gld], &mut CanonicalNames).unwrap();
        let record = table.get("k").unwrap();
        assert!(record.contains("Duration"));
        assert!(record.contains("gld_throughput"));
    }

    #[test]
    fn test_ingest_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.log");
        assert!(ingest_logs(&config(&[]), &[missing], &mut CanonicalNames).is_err());
    }

    #[test]
    fn test_resolver_selection() {
        let runner = ScriptedProfiler::new(&[]);
        let mut builtin = config(&[]);
        builtin.demangler.clear();

        let mut resolver = name_resolver(&builtin, &runner);
        assert_eq!(resolver.resolve("_Z6vecAddPfS_S_i").unwrap(), "vecAdd");
        assert!(runner.calls.borrow().is_empty());
    }
}
