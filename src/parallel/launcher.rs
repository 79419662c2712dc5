//! Running the analysis tool
//!
//! `Launcher` is the seam between workers and the operating system; the
//! dispatcher uses `ProcessLauncher`, tests substitute their own.

use std::process::{Command, Stdio};

use super::types::InvocationResult;

pub trait Launcher: Send + Sync {
    /// Run `argv` to completion and capture both output streams in full.
    fn launch(&self, argv: &[String]) -> InvocationResult;
}

/// Spawns real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, argv: &[String]) -> InvocationResult {
        let Some((program, args)) = argv.split_first() else {
            let error = std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line");
            return InvocationResult::launch_failure("", &error);
        };

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        match output {
            Ok(output) => InvocationResult {
                exit_code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            },
            Err(e) => InvocationResult::launch_failure(program, &e),
        }
    }
}
