//! External tool invocation
//!
//! The profiler and the demangler are separate programs. They are reached
//! through `ExternalToolRunner` so the pipeline can be driven by scripted
//! output in tests.

use crate::error::{ProfileError, Result};
use std::io;
use std::process::Command;
use tracing::debug;

/// Captured result of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a command line to completion and captures its output
pub trait ExternalToolRunner {
    /// `command[0]` is the program, the rest its arguments
    fn run(&self, command: &[String]) -> io::Result<ToolOutput>;
}

/// Runner backed by real child processes. Blocks until the child exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ExternalToolRunner for ProcessRunner {
    fn run(&self, command: &[String]) -> io::Result<ToolOutput> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;

        let output = Command::new(program).args(args).output()?;

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            // killed by a signal
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Run `command`, turning spawn failures and non-zero exits into errors
pub fn run_checked(runner: &dyn ExternalToolRunner, command: &[String]) -> Result<ToolOutput> {
    let command_line = command.join(" ");
    debug!("Running {}", command_line);

    let output = runner.run(command).map_err(|source| ProfileError::Spawn {
        command: command_line.clone(),
        source,
    })?;

    if !output.success() {
        return Err(ProfileError::ExternalTool {
            command: command_line,
            code: output.exit_code,
            stderr: output.stderr.trim_end().to_string(),
        });
    }

    Ok(output)
}
