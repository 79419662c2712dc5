//! Command lines for the analysis tool
//!
//! Every task turns into exactly one argument vector:
//! `<binary> <file> [-header-filter=<re>] [-export-fixes=<yaml>] -- -I<include dir>`.

use std::path::Path;

/// Analysis binary used when none is configured (resolved through `PATH`)
pub const DEFAULT_BINARY: &str = "clang-tidy";

/// Project include directory passed to the compiler after the separator
pub const DEFAULT_INCLUDE_DIR: &str = "cugl/include";

/// Ends tool options; everything after it is a compiler flag
pub const OPTIONS_SEPARATOR: &str = "--";

/// Build the argument vector for one file with no fix export.
pub fn build_invocation(filename: &str, binary: &str, header_filter: Option<&str>) -> Vec<String> {
    InvocationBuilder::new(binary)
        .with_header_filter(header_filter.map(str::to_string))
        .build(filename, None)
}

/// Holds the per-run parts of an invocation so workers only supply the file
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    binary: String,
    header_filter: Option<String>,
    include_dir: String,
}

impl InvocationBuilder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            header_filter: None,
            include_dir: DEFAULT_INCLUDE_DIR.to_string(),
        }
    }

    /// Empty patterns are treated as absent.
    pub fn with_header_filter(mut self, header_filter: Option<String>) -> Self {
        self.header_filter = header_filter.filter(|pattern| !pattern.is_empty());
        self
    }

    pub fn with_include_dir(mut self, include_dir: impl Into<String>) -> Self {
        self.include_dir = include_dir.into();
        self
    }

    pub fn build(&self, filename: &str, export_fixes: Option<&Path>) -> Vec<String> {
        let mut argv = Vec::with_capacity(6);
        argv.push(self.binary.clone());
        argv.push(filename.to_string());

        if let Some(pattern) = &self.header_filter {
            argv.push(format!("-header-filter={}", pattern));
        }

        if let Some(path) = export_fixes {
            argv.push(format!("-export-fixes={}", path.display()));
        }

        argv.push(OPTIONS_SEPARATOR.to_string());
        argv.push(format!("-I{}", self.include_dir));
        argv
    }
}

impl Default for InvocationBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}
