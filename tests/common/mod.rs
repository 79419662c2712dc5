// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Path of the tidyrun binary built for this test run
pub fn tidyrun_binary() -> &'static str {
    env!("CARGO_BIN_EXE_tidyrun")
}

/// A tidyrun command isolated from the developer's own config files and
/// log settings: cwd, HOME and XDG_CONFIG_HOME all point at `dir`.
pub fn tidyrun_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(tidyrun_binary());
    cmd.args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("TIDYRUN_LOG")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

pub fn output_triple(output: Output) -> (String, String, i32) {
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Run tidyrun inside `dir` and collect (stdout, stderr, exit code)
pub fn run_tidyrun_in(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = tidyrun_command(dir, args)
        .output()
        .expect("Failed to execute tidyrun");
    output_triple(output)
}

/// Run tidyrun in a throwaway directory
pub fn run_tidyrun(args: &[&str]) -> (String, String, i32) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    run_tidyrun_in(dir.path(), args)
}

/// Write an executable shell script standing in for clang-tidy.
///
/// The file is written by a child shell so this process never holds a
/// writable descriptor that a concurrently spawned test could inherit
/// (which would make exec fail with ETXTBSY).
pub fn write_fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let script = format!("#!/bin/sh\n{}\n", body);

    let mut child = Command::new("sh")
        .arg("-c")
        .arg("cat > \"$1\" && chmod 755 \"$1\"")
        .arg("sh")
        .arg(&path)
        .stdin(Stdio::piped())
        .spawn()
        .expect("Failed to spawn sh");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(script.as_bytes())
        .expect("Failed to write script");
    let status = child.wait().expect("Failed to wait for sh");
    assert!(status.success(), "Failed to create fake tool {}", path.display());

    path
}

/// Header lines printed for each invocation of `binary`
pub fn headers<'a>(stdout: &'a str, binary: &str) -> Vec<&'a str> {
    let prefix = format!("{} ", binary);
    stdout
        .lines()
        .filter(|line| line.starts_with(&prefix))
        .collect()
}
