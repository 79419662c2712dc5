use anyhow::Result;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};
use std::thread;

// Cross-platform signal handling
#[cfg(unix)]
use signal_hook::{consts::SIGINT, consts::SIGPIPE, consts::SIGTERM, iterator::Signals};

#[cfg(windows)]
use signal_hook::{consts::SIGINT, flag};

/// Printed when the run is aborted by the user
pub const INTERRUPT_NOTICE: &str = "Ctrl-C detected, goodbye.";

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
    SignalInt = 130,  // 128 + SIGINT (2)
    SignalPipe = 141, // 128 + SIGPIPE (13)
    SignalTerm = 143, // 128 + SIGTERM (15)
}

impl ExitCode {
    pub fn exit(self) -> ! {
        process::exit(self as i32)
    }
}

/// Scratch paths that must not outlive an aborted run
#[derive(Debug, Clone, Default)]
pub struct ProcessCleanup {
    dirs: Arc<Mutex<Vec<PathBuf>>>,
}

impl ProcessCleanup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_dir(&self, dir: PathBuf) {
        match self.dirs.lock() {
            Ok(mut dirs) => dirs.push(dir),
            Err(poisoned) => poisoned.into_inner().push(dir),
        }
    }

    pub fn registered(&self) -> Vec<PathBuf> {
        match self.dirs.lock() {
            Ok(dirs) => dirs.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Remove every registered directory, ignoring ones already gone
    pub fn run(&self) {
        for dir in self.registered() {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(&dir) {
                    tracing::warn!(dir = %dir.display(), "failed to remove scratch directory: {}", e);
                }
            }
        }
    }
}

/// Signal handler that aborts the whole process
///
/// Workers and their children are abandoned; only the registered cleanup runs.
pub struct SignalHandler {
    _handle: thread::JoinHandle<()>,
}

impl SignalHandler {
    /// Initialize signal handling - cross-platform
    pub fn new(cleanup: ProcessCleanup) -> Result<Self> {
        #[cfg(unix)]
        {
            let mut signals = Signals::new([SIGINT, SIGPIPE, SIGTERM])?;

            let handle = thread::spawn(move || {
                for sig in signals.forever() {
                    match sig {
                        SIGINT => abort_run(&cleanup, ExitCode::SignalInt),
                        SIGTERM => abort_run(&cleanup, ExitCode::SignalTerm),
                        SIGPIPE => {
                            // Broken pipe - exit quietly (normal for Unix pipes)
                            cleanup.run();
                            ExitCode::SignalPipe.exit();
                        }
                        _ => {
                            tracing::warn!(signal = sig, "received unexpected signal");
                        }
                    }
                }
            });

            Ok(SignalHandler { _handle: handle })
        }

        #[cfg(windows)]
        {
            // Windows signal handling using flag-based approach
            let term_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
            flag::register(SIGINT, Arc::clone(&term_flag))?;

            let handle = thread::spawn(move || loop {
                thread::sleep(std::time::Duration::from_millis(100));
                if term_flag.load(std::sync::atomic::Ordering::Relaxed) {
                    abort_run(&cleanup, ExitCode::SignalInt);
                }
            });

            Ok(SignalHandler { _handle: handle })
        }
    }
}

fn abort_run(cleanup: &ProcessCleanup, code: ExitCode) -> ! {
    let mut stdout = io::stdout();
    let _ = writeln!(stdout, "\n{}", INTERRUPT_NOTICE);
    let _ = stdout.flush();
    cleanup.run();
    code.exit();
}

/// Safe wrapper for writing to stdout that handles broken pipes and other I/O errors
pub struct SafeStdout {
    stdout: io::Stdout,
}

impl SafeStdout {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
        }
    }

    /// Cross-platform broken pipe detection
    fn is_broken_pipe(e: &io::Error) -> bool {
        #[cfg(unix)]
        {
            e.kind() == io::ErrorKind::BrokenPipe
        }
        #[cfg(windows)]
        {
            // On Windows, broken pipe manifests as different error codes
            e.kind() == io::ErrorKind::BrokenPipe
                || e.raw_os_error() == Some(232) // ERROR_NO_DATA "The pipe is being closed"
                || e.raw_os_error() == Some(109) // ERROR_BROKEN_PIPE "The pipe has been ended"
        }
    }

    fn check<T>(result: io::Result<T>) -> io::Result<T> {
        match result {
            Err(e) if Self::is_broken_pipe(&e) => {
                // Broken pipe is normal in pipelines - exit quietly
                ExitCode::SignalPipe.exit();
            }
            other => other,
        }
    }
}

impl Default for SafeStdout {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for SafeStdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Self::check(self.stdout.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Self::check(self.stdout.flush())
    }
}

/// Safe wrapper for writing diagnostics to stderr
pub struct SafeStderr {
    stderr: io::Stderr,
}

impl SafeStderr {
    pub fn new() -> Self {
        Self {
            stderr: io::stderr(),
        }
    }

    /// Write a line to stderr; there is nowhere left to report a failure
    pub fn writeln(&mut self, data: &str) {
        let _ = writeln!(self.stderr, "{}", data);
    }

    /// Report a fatal error with the tool prefix and exit
    pub fn fail(&mut self, code: ExitCode, message: &str) -> ! {
        self.writeln(&format_error_message(message));
        code.exit();
    }
}

impl Default for SafeStderr {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_error_message(message: &str) -> String {
    format!("tidyrun: Error: {}", message)
}
