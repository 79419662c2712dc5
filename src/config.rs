use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::cli::Cli;
use crate::compile_db;
use crate::invocation::InvocationBuilder;
use crate::parallel::ParallelConfig;
use crate::selection::FileSelector;

/// Resolved configuration for one tidyrun run
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub selection: SelectionConfig,
    pub invocation: InvocationConfig,
    pub performance: PerformanceConfig,
    pub export_fixes: Option<PathBuf>,
}

/// Which files are considered and which of them are checked
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    pub selector: FileSelector,
    pub source: CandidateSource,
}

/// Where the candidate list comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    /// Given on the command line with -cpp
    Explicit(Vec<String>),
    /// Read from compile_commands.json, in `build_path` or found by walking up
    Database { build_path: Option<PathBuf> },
}

#[derive(Debug, Clone)]
pub struct InvocationConfig {
    pub binary: String,
    pub header_filter: Option<String>,
    pub include_dir: String,
}

#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    /// 0 means one worker per CPU
    pub jobs: usize,
    pub queue_capacity: Option<usize>,
}

impl RunnerConfig {
    /// Validate the parsed command line. Errors here are usage errors.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let selector = FileSelector::new(cli.files.as_slice())?;

        if cli.queue_capacity == Some(0) {
            bail!("--queue-capacity must be at least 1");
        }
        if cli.clang_tidy_binary.is_empty() {
            bail!("-clang-tidy-binary must not be empty");
        }

        let source = match &cli.cpp {
            Some(files) => CandidateSource::Explicit(files.clone()),
            None => CandidateSource::Database {
                build_path: cli.build_path.clone(),
            },
        };

        Ok(Self {
            selection: SelectionConfig { selector, source },
            invocation: InvocationConfig {
                binary: cli.clang_tidy_binary.clone(),
                header_filter: cli.header_filter.clone(),
                include_dir: cli.include_dir.clone(),
            },
            performance: PerformanceConfig {
                jobs: cli.jobs,
                queue_capacity: cli.queue_capacity,
            },
            export_fixes: cli.export_fixes.clone(),
        })
    }

    /// Get effective worker count with defaults
    pub fn effective_jobs(&self) -> usize {
        if self.performance.jobs == 0 {
            num_cpus::get()
        } else {
            self.performance.jobs
        }
    }

    pub fn parallel_config(&self) -> ParallelConfig {
        ParallelConfig {
            queue_capacity: self.performance.queue_capacity,
            ..ParallelConfig::with_workers(self.effective_jobs())
        }
    }

    pub fn invocation_builder(&self) -> InvocationBuilder {
        InvocationBuilder::new(self.invocation.binary.clone())
            .with_header_filter(self.invocation.header_filter.clone())
            .with_include_dir(self.invocation.include_dir.clone())
    }

    /// Candidate file names in input order
    pub fn resolve_candidates(&self) -> Result<Vec<String>> {
        match &self.selection.source {
            CandidateSource::Explicit(files) => Ok(files.clone()),
            CandidateSource::Database { build_path } => {
                let database = compile_db::locate(build_path.as_deref())?;
                tracing::debug!(database = %database.display(), "reading compilation database");
                compile_db::load_files(&database)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::normalize_single_dash_long;
    use clap::Parser;

    fn parse_config(items: &[&str]) -> Result<RunnerConfig> {
        let args = items.iter().map(|s| s.to_string()).collect();
        let cli = Cli::try_parse_from(normalize_single_dash_long(args)).unwrap();
        RunnerConfig::from_cli(&cli)
    }

    #[test]
    fn test_explicit_candidates() {
        let config = parse_config(&["tidyrun", "-cpp", "b.cpp", "a.cpp"]).unwrap();
        assert_eq!(
            config.resolve_candidates().unwrap(),
            vec!["b.cpp".to_string(), "a.cpp".to_string()]
        );
    }

    #[test]
    fn test_database_source_without_cpp() {
        let config = parse_config(&["tidyrun", "-p", "build"]).unwrap();
        assert_eq!(
            config.selection.source,
            CandidateSource::Database {
                build_path: Some(PathBuf::from("build"))
            }
        );
    }

    #[test]
    fn test_jobs_zero_means_cpu_count() {
        let config = parse_config(&["tidyrun", "-cpp"]).unwrap();
        assert_eq!(config.effective_jobs(), num_cpus::get());

        let config = config_with_jobs(3);
        let parallel = config.parallel_config();
        assert_eq!(parallel.num_workers, 3);
        assert_eq!(parallel.effective_capacity(), 3);
    }

    fn config_with_jobs(jobs: usize) -> RunnerConfig {
        parse_config(&["tidyrun", "-j", &jobs.to_string(), "-cpp"]).unwrap()
    }

    #[test]
    fn test_queue_capacity_override() {
        let config = parse_config(&["tidyrun", "-j", "2", "--queue-capacity", "7", "-cpp"]).unwrap();
        assert_eq!(config.parallel_config().effective_capacity(), 7);
        assert!(parse_config(&["tidyrun", "--queue-capacity", "0"]).is_err());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = parse_config(&["tidyrun", "src/(unclosed"]).unwrap_err();
        assert!(err.to_string().contains("src/(unclosed"));
    }

    #[test]
    fn test_invocation_builder_carries_options() {
        let config = parse_config(&[
            "tidyrun",
            "-clang-tidy-binary",
            "clang-tidy-17",
            "-header-filter",
            "cugl/.*",
            "--include-dir",
            "third_party/include",
            "-cpp",
        ])
        .unwrap();
        let argv = config.invocation_builder().build("x.cpp", None);
        assert_eq!(
            argv,
            vec![
                "clang-tidy-17",
                "x.cpp",
                "-header-filter=cugl/.*",
                "--",
                "-Ithird_party/include"
            ]
        );
    }
}
