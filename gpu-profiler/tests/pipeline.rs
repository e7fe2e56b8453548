//! Integration test: full session (profile passes → synthesis → rooflines → output)
//!
//! Drives `ProfileSession` with canned nvprof output instead of a GPU.

use nvroof_gpu::output::{render_report, write_outputs, OutputOptions};
use nvroof_gpu::{
    analyze_table, DerivationRules, ExternalToolRunner, ProfileConfig, ProfileSession, ToolOutput,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;

const GIB: f64 = 1_073_741_824.0;

/// Answers profiler invocations with queued stderr, in order
struct CannedProfiler {
    outputs: RefCell<VecDeque<String>>,
    commands: RefCell<Vec<Vec<String>>>,
}

impl CannedProfiler {
    fn new(outputs: &[String]) -> Self {
        Self {
            outputs: RefCell::new(outputs.iter().cloned().collect()),
            commands: RefCell::new(Vec::new()),
        }
    }
}

impl ExternalToolRunner for CannedProfiler {
    fn run(&self, command: &[String]) -> io::Result<ToolOutput> {
        self.commands.borrow_mut().push(command.to_vec());
        let stderr = self
            .outputs
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "unexpected invocation"))?;
        Ok(ToolOutput {
            stdout: String::new(),
            stderr,
            exit_code: 0,
        })
    }
}

fn trace_pass() -> String {
    r#"==100== NVPROF is profiling process 100, command: ./saxpy
==100== Profiling application: ./saxpy
==100== Profiling result:
"Start","Duration","Name","flop_count_sp"
ms,ns,,
0.5,1.0,"_Z5saxpyifPfS_ [3]",100
0.7,1.0,"_Z5saxpyifPfS_ [4]",200
"#
    .to_string()
}

fn dram_pass(durations: [f64; 2]) -> String {
    format!(
        r#"==101== NVPROF is profiling process 101, command: ./saxpy
==101== Profiling application: ./saxpy
==101== Profiling result:
"Device","Kernel","Duration","dram_read_throughput","dram_write_throughput"
,,ns,GB/s,GB/s
"Tesla K80 (0)","_Z5saxpyifPfS_",{},50,10
"Tesla K80 (0)","_Z5saxpyifPfS_",{},60,10
"#,
        durations[0], durations[1]
    )
}

fn config() -> ProfileConfig {
    ProfileConfig {
        // builtin demangler, the runner only answers profiler passes
        demangler: Vec::new(),
        metrics: vec!["dram_read_throughput,dram_write_throughput".to_string()],
        ..Default::default()
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * b.abs().max(1.0)
}

fn assert_series(actual: Option<Vec<f64>>, expected: &[f64]) {
    let actual = actual.expect("numeric series");
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!(close(*a, *e), "{actual:?} vs {expected:?}");
    }
}

#[test]
fn test_two_pass_session() {
    let config = config();
    let runner = CannedProfiler::new(&[trace_pass(), dram_pass([1.0, 1.0])]);
    let program = vec!["./saxpy".to_string(), "1024".to_string()];
    let session = ProfileSession::new(&config, &runner, program);

    let mut resolver = session.resolver();
    let mut table = session.collect(&mut resolver, |_, _| {}).unwrap();

    assert_eq!(runner.commands.borrow().len(), 2);
    assert_eq!(
        runner.commands.borrow()[1][..3],
        ["nvprof", "--metrics", "dram_read_throughput,dram_write_throughput"]
    );
    assert_eq!(table.kernel_names().collect::<Vec<_>>(), vec!["saxpy"]);
    assert!(resolver.warnings().is_empty());

    let rooflines = analyze_table(&mut table, &DerivationRules::default()).unwrap();
    let saxpy = table.get("saxpy").unwrap();

    assert_eq!(saxpy.call_count(), 2);
    assert_series(
        saxpy.get("dram_throughput").and_then(|s| s.numbers()),
        &[60.0 * GIB, 70.0 * GIB],
    );
    assert_series(
        saxpy.get("dram_bytes").and_then(|s| s.numbers()),
        &[60.0 * GIB * 1.0e-9, 70.0 * GIB * 1.0e-9],
    );
    assert!(saxpy.get("dram_bytes").unwrap().samples().iter().all(|s| s.pass == 1));

    let point = rooflines.get("saxpy", "memory").unwrap();
    assert_eq!(point.flop_metric, "flop_count_sp");
    assert_eq!(point.runs, 2);
    // 100 and 200 flops in 1 ns each
    assert!(close(point.performance_mean, 1.5e11));
    let intensity = [100.0 / (60.0 * GIB * 1.0e-9), 200.0 / (70.0 * GIB * 1.0e-9)];
    assert!(close(point.intensity_mean, (intensity[0] + intensity[1]) / 2.0));
    assert!(point.intensity_std_dev > 0.0);

    let temp_dir = tempfile::tempdir().unwrap();
    let options = OutputOptions {
        model_name: "saxpy".to_string(),
        output_dir: temp_dir.path().to_path_buf(),
        json_path: Some(temp_dir.path().join("saxpy.json")),
    };
    let written = write_outputs(&table, &rooflines, &options).unwrap();

    let model = std::fs::read_to_string(&written.model).unwrap();
    assert!(model.contains("kernel saxpy {"));
    assert!(model.contains("execute [ 2 ]"));
    assert!(model.contains("flops [ 150 / numThreads ] as sp"));
    assert!(model.contains("call saxpy()"));

    assert_eq!(written.rooflines, vec![temp_dir.path().join("saxpy_saxpy.csv")]);
    let csv = std::fs::read_to_string(&written.rooflines[0]).unwrap();
    assert_eq!(csv.lines().count(), 1);
    assert!(csv.trim_end().ends_with(",memory"));

    let json = std::fs::read_to_string(written.json.unwrap()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["rooflines"][0]["kernel"], "saxpy");

    let report = render_report(&table, &rooflines).unwrap();
    assert!(report.contains("Roofline points\nmemory saxpy"));
}

#[test]
fn test_counts_use_their_own_pass_duration() {
    let config = config();
    let runner = CannedProfiler::new(&[trace_pass(), dram_pass([2.0, 4.0])]);
    let session = ProfileSession::new(&config, &runner, vec!["./saxpy".to_string()]);

    let mut resolver = session.resolver();
    let mut table = session.collect(&mut resolver, |_, _| {}).unwrap();
    analyze_table(&mut table, &DerivationRules::default()).unwrap();

    let saxpy = table.get("saxpy").unwrap();
    // pass 1 durations are 1 ns, pass 2 durations 2 and 4 ns
    assert_series(
        saxpy.get("dram_bytes").and_then(|s| s.numbers()),
        &[60.0 * GIB * 2.0e-9, 70.0 * GIB * 4.0e-9],
    );
    assert_series(
        saxpy.get("dram_write_bytes").and_then(|s| s.numbers()),
        &[10.0 * GIB * 2.0e-9, 10.0 * GIB * 4.0e-9],
    );
}

#[test]
fn test_profiler_failure_aborts_session() {
    let config = config();
    let runner = CannedProfiler::new(&[trace_pass()]);
    let session = ProfileSession::new(&config, &runner, vec!["./saxpy".to_string()]);

    let mut resolver = session.resolver();
    let err = session.collect(&mut resolver, |_, _| {}).unwrap_err();
    assert!(matches!(err, nvroof_gpu::ProfileError::Spawn { .. }));
}
