use anyhow::{Context, Result};
use clap::Parser;

use tidyrun::cli::{extract_config_file_arg, normalize_single_dash_long, Cli};
use tidyrun::config::RunnerConfig;
use tidyrun::config_file::ConfigFile;
use tidyrun::logging;
use tidyrun::parallel::Dispatcher;
use tidyrun::platform::{format_error_message, ExitCode, ProcessCleanup, SafeStderr, SignalHandler};
use tidyrun::replacements::merge_replacement_files;

fn main() {
    // Cleanup shared with the signal handler; scratch dirs are registered later
    let cleanup = ProcessCleanup::new();

    // Initialize signal handling before any worker can start
    let _signal_handler = match SignalHandler::new(cleanup.clone()) {
        Ok(handler) => handler,
        Err(e) => {
            eprintln!("{}", format_error_message(&format!("Failed to initialize signal handling: {}", e)));
            ExitCode::GeneralError.exit();
        }
    };

    let mut stderr = SafeStderr::new();

    // Process command line arguments with config file support
    let cli = process_args_with_config(&mut stderr);

    if let Err(e) = logging::setup_logging(cli.verbose) {
        stderr.fail(ExitCode::InvalidUsage, &format!("{:#}", e));
    }

    let config = match RunnerConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => stderr.fail(ExitCode::InvalidUsage, &format!("{:#}", e)),
    };

    let exit_code = match run(&config, &cleanup) {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!("run aborted: {:?}", e);
            stderr.writeln(&format_error_message(&format!("{:#}", e)));
            ExitCode::GeneralError
        }
    };

    exit_code.exit();
}

/// Apply config file defaults and aliases, then parse the command line.
fn process_args_with_config(stderr: &mut SafeStderr) -> Cli {
    let raw_args: Vec<String> = std::env::args().collect();
    let config_file_path = extract_config_file_arg(&raw_args);

    // Check for --show-config first, before any other processing
    if raw_args.iter().any(|arg| arg == "--show-config") {
        ConfigFile::show_config(config_file_path.as_deref());
        ExitCode::Success.exit();
    }

    let processed_args = if raw_args.iter().any(|arg| arg == "--ignore-config") {
        raw_args
    } else {
        match ConfigFile::load_with_custom_path(config_file_path.as_deref())
            .and_then(|config_file| config_file.process_args(raw_args))
        {
            Ok(processed) => processed,
            Err(e) => stderr.fail(ExitCode::InvalidUsage, &format!("Config error: {:#}", e)),
        }
    };

    // Parse errors exit 2, --help and --version exit 0
    match Cli::try_parse_from(normalize_single_dash_long(processed_args)) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    }
}

fn run(config: &RunnerConfig, cleanup: &ProcessCleanup) -> Result<ExitCode> {
    let candidates = config.resolve_candidates()?;

    let scratch = match &config.export_fixes {
        Some(_) => {
            let dir = tempfile::Builder::new()
                .prefix("tidyrun-fixes-")
                .tempdir()
                .context("Failed to create scratch directory for exported fixes")?;
            cleanup.register_dir(dir.path().to_path_buf());
            Some(dir)
        }
        None => None,
    };

    let dispatcher = Dispatcher::new(config.parallel_config(), config.invocation_builder())
        .with_fixes_dir(scratch.as_ref().map(|dir| dir.path().to_path_buf()));

    let report = dispatcher.run(&candidates, &config.selection.selector)?;

    if let (Some(merge_file), Some(dir)) = (&config.export_fixes, &scratch) {
        tracing::info!(output = %merge_file.display(), "writing fixes");
        merge_replacement_files(dir.path(), merge_file)?;
    }

    // Scratch directory is removed when `scratch` drops
    Ok(report.exit_code())
}
