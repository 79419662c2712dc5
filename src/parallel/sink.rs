//! Serialized output for concurrent workers
//!
//! All writes for one invocation happen under a single lock, so the header
//! and captured stdout of two invocations never interleave. Captured stderr
//! goes out inside the same region, after stdout has been flushed.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use crate::platform::SafeStdout;

use super::types::InvocationResult;

struct SinkStreams {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

pub struct OutputSink {
    streams: Mutex<SinkStreams>,
}

impl OutputSink {
    pub fn new<O, E>(out: O, err: E) -> Self
    where
        O: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        Self {
            streams: Mutex::new(SinkStreams {
                out: Box::new(out),
                err: Box::new(err),
            }),
        }
    }

    /// Process stdout (exits quietly on a broken pipe) and stderr
    pub fn stdio() -> Self {
        Self::new(SafeStdout::new(), io::stderr())
    }

    /// Lock the streams with poison recovery
    fn lock(&self) -> MutexGuard<'_, SinkStreams> {
        match self.streams.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("worker thread panicked while writing output, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn emit(&self, header: &str, stdout_text: &str, stderr_text: &str) -> Result<()> {
        let mut guard = self.lock();
        let streams = &mut *guard;

        write_block(&mut streams.out, header, stdout_text)
            .context("Failed to write invocation output")?;

        if !stderr_text.is_empty() {
            streams
                .out
                .flush()
                .context("Failed to flush standard output")?;
            forward(&mut streams.err, stderr_text).context("Failed to forward invocation stderr")?;
        }

        Ok(())
    }

    /// Emit one finished invocation: the space-joined command line as header.
    pub fn emit_result(&self, argv: &[String], result: &InvocationResult) -> Result<()> {
        self.emit(&argv.join(" "), &result.stdout_text(), &result.stderr_text())
    }

    pub fn flush(&self) -> Result<()> {
        let mut guard = self.lock();
        guard.out.flush().context("Failed to flush standard output")?;
        guard.err.flush().context("Failed to flush standard error")?;
        Ok(())
    }
}

fn write_block(out: &mut dyn Write, header: &str, body: &str) -> io::Result<()> {
    out.write_all(header.as_bytes())?;
    out.write_all(b"\n")?;
    out.write_all(body.as_bytes())
}

fn forward(err: &mut dyn Write, text: &str) -> io::Result<()> {
    err.write_all(text.as_bytes())?;
    err.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    /// Cloneable in-memory stream that records every write
    #[derive(Clone, Default)]
    struct SharedBuffer {
        bytes: Arc<Mutex<Vec<u8>>>,
        flushes: Arc<Mutex<Vec<usize>>>,
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.bytes.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            let len = self.bytes.lock().unwrap().len();
            self.flushes.lock().unwrap().push(len);
            Ok(())
        }
    }

    #[test]
    fn test_header_then_stdout() {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let sink = OutputSink::new(out.clone(), err.clone());

        sink.emit("clang-tidy a.cpp -- -Icugl/include", "a.cpp:1:1: warning: x\n", "")
            .unwrap();

        assert_eq!(
            out.contents(),
            "clang-tidy a.cpp -- -Icugl/include\na.cpp:1:1: warning: x\n"
        );
        assert!(err.contents().is_empty());
        assert!(out.flushes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stderr_forwarded_after_stdout_flush() {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let sink = OutputSink::new(out.clone(), err.clone());

        sink.emit("tool b.cpp", "", "1 warning generated.\n").unwrap();

        assert_eq!(out.contents(), "tool b.cpp\n");
        assert_eq!(err.contents(), "1 warning generated.\n");
        // stdout was flushed with the header already in it
        assert_eq!(out.flushes.lock().unwrap().as_slice(), &["tool b.cpp\n".len()]);
    }

    #[test]
    fn test_emit_result_joins_argv() {
        let out = SharedBuffer::default();
        let sink = OutputSink::new(out.clone(), SharedBuffer::default());
        let argv: Vec<String> = ["clang-tidy", "c.cpp", "--", "-Icugl/include"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let result = InvocationResult::exited(1, b"diag\n".to_vec(), Vec::new());

        sink.emit_result(&argv, &result).unwrap();
        assert_eq!(out.contents(), "clang-tidy c.cpp -- -Icugl/include\ndiag\n");
    }

    #[test]
    fn test_concurrent_blocks_do_not_interleave() {
        let out = SharedBuffer::default();
        let sink = Arc::new(OutputSink::new(out.clone(), SharedBuffer::default()));
        let lines_per_block = 25;

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for round in 0..40 {
                        let tag = format!("w{}r{}", worker, round);
                        let body: String = (0..lines_per_block)
                            .map(|line| format!("{}:{}\n", tag, line))
                            .collect();
                        sink.emit(&format!("HEADER {}", tag), &body, "").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = out.contents();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 8 * 40 * (lines_per_block + 1));
        for block in lines.chunks(lines_per_block + 1) {
            let tag = block[0].strip_prefix("HEADER ").expect("block starts with header");
            for (index, line) in block[1..].iter().enumerate() {
                assert_eq!(*line, format!("{}:{}", tag, index));
            }
        }
    }
}
