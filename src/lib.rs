// Core library for the tidyrun parallel clang-tidy runner

pub mod cli;
pub mod compile_db;
pub mod config;
pub mod config_file;
pub mod invocation;
pub mod logging;
pub mod parallel;
pub mod platform;
pub mod replacements;
pub mod selection;

pub use config::RunnerConfig;
pub use invocation::{build_invocation, InvocationBuilder};
pub use parallel::{Dispatcher, Launcher, OutputSink, ParallelConfig, RunReport};
pub use platform::ExitCode;
pub use selection::FileSelector;
