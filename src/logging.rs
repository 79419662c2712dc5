use anyhow::{anyhow, Result};
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a full `EnvFilter` directive
pub const LOG_ENV: &str = "TIDYRUN_LOG";

/// Directive used when `TIDYRUN_LOG` is unset or empty
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "tidyrun=debug,warn"
    } else {
        "tidyrun=warn"
    }
}

fn build_filter(verbose: bool, env_value: Option<&str>) -> Result<EnvFilter> {
    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|e| anyhow!("Invalid {} value '{}': {}", LOG_ENV, directive, e)),
        None => Ok(EnvFilter::new(default_directive(verbose))),
    }
}

/// Install the global subscriber. Log lines go to stderr so they never mix
/// with the captured tool output on stdout.
pub fn setup_logging(verbose: bool) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = build_filter(verbose, env_value.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
