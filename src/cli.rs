// CLI definitions and pre-parse argument handling

use clap::Parser;
use std::path::PathBuf;

use crate::invocation::{DEFAULT_BINARY, DEFAULT_INCLUDE_DIR};

/// Long options the classic run-clang-tidy script spells with a single dash
const LEGACY_LONG_OPTIONS: &[&str] = &["clang-tidy-binary", "header-filter", "cpp", "export-fixes"];

#[derive(Parser, Debug)]
#[command(name = "tidyrun")]
#[command(about = "Run clang-tidy over many source files in parallel")]
#[command(
    long_about = "Run clang-tidy over many source files in parallel\n\nCandidates come from -cpp FILES, or from compile_commands.json when -cpp is\nnot given. Positional PATTERNS are regular expressions; a candidate is checked\nif any pattern matches at the start of its path.\n\nEXAMPLES:\n  tidyrun -cpp src/*.cpp\n  tidyrun -header-filter='cugl/include/.*' 'src/render/' -cpp $(git ls-files '*.cpp')\n  tidyrun -p build -j 8 -export-fixes fixes.yaml\n\nThe exit status is 1 when any clang-tidy invocation fails."
)]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Regular expressions matched against the start of each candidate path (default: all)
    #[arg(value_name = "PATTERNS", help_heading = "Selection")]
    pub files: Vec<String>,

    /// Explicit list of source files to consider
    #[arg(long = "cpp", value_name = "FILES", num_args = 0.., help_heading = "Selection")]
    pub cpp: Option<Vec<String>>,

    /// Directory containing compile_commands.json (used when -cpp is absent)
    #[arg(short = 'p', long = "build-path", value_name = "DIR", help_heading = "Selection")]
    pub build_path: Option<PathBuf>,

    /// Path to the clang-tidy binary
    #[arg(
        long = "clang-tidy-binary",
        value_name = "PATH",
        default_value = DEFAULT_BINARY,
        help_heading = "Invocation"
    )]
    pub clang_tidy_binary: String,

    /// Regular expression matching headers to report diagnostics for
    #[arg(
        long = "header-filter",
        value_name = "PATTERN",
        allow_hyphen_values = true,
        help_heading = "Invocation"
    )]
    pub header_filter: Option<String>,

    /// Include directory passed to every invocation
    #[arg(
        long = "include-dir",
        value_name = "DIR",
        default_value = DEFAULT_INCLUDE_DIR,
        help_heading = "Invocation"
    )]
    pub include_dir: String,

    /// Merge the suggested fixes of every file into this YAML file
    #[arg(long = "export-fixes", value_name = "FILE", help_heading = "Invocation")]
    pub export_fixes: Option<PathBuf>,

    /// Number of concurrent clang-tidy processes (0 = number of CPUs)
    #[arg(short = 'j', long = "jobs", value_name = "N", default_value_t = 0, help_heading = "Performance")]
    pub jobs: usize,

    /// Maximum number of queued files (default: number of jobs)
    #[arg(long = "queue-capacity", value_name = "N", help_heading = "Performance")]
    pub queue_capacity: Option<usize>,

    /// Use alias from configuration file
    #[arg(short = 'a', long = "alias", value_name = "NAME", help_heading = "Configuration")]
    pub alias: Vec<String>,

    /// Specify custom configuration file path
    #[arg(long = "config-file", value_name = "FILE", help_heading = "Configuration")]
    pub config_file: Option<String>,

    /// Ignore configuration file
    #[arg(long = "ignore-config", help_heading = "Configuration")]
    pub ignore_config: bool,

    /// Show current configuration with precedence information and exit
    #[arg(long = "show-config", help_heading = "Configuration")]
    pub show_config: bool,

    /// Print lifecycle diagnostics to stderr (TIDYRUN_LOG overrides)
    #[arg(short = 'v', long = "verbose", help_heading = "Display")]
    pub verbose: bool,
}

/// Rewrite `-header-filter X` style options to their `--` spelling.
///
/// Both the separate and the `=value` forms are accepted. Everything after a
/// bare `--` is left alone.
pub fn normalize_single_dash_long(args: Vec<String>) -> Vec<String> {
    let mut passthrough = false;
    args.into_iter()
        .map(|arg| {
            if passthrough {
                return arg;
            }
            if arg == "--" {
                passthrough = true;
                return arg;
            }
            match legacy_option(&arg) {
                Some(_) => format!("-{}", arg),
                None => arg,
            }
        })
        .collect()
}

fn legacy_option(arg: &str) -> Option<&'static str> {
    let body = arg.strip_prefix('-')?;
    if body.starts_with('-') {
        return None;
    }
    let name = body.split_once('=').map_or(body, |(name, _)| name);
    LEGACY_LONG_OPTIONS.iter().copied().find(|option| *option == name)
}

/// Value of `--config-file` in the raw arguments, if any
pub fn extract_config_file_arg(args: &[String]) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config-file" {
            return iter.next().cloned();
        }
        if let Some(value) = arg.strip_prefix("--config-file=") {
            return Some(value.to_string());
        }
    }
    None
}
