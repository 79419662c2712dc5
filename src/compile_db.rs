//! Compilation database input
//!
//! When no explicit file list is given, candidates come from the `file`
//! entries of a `compile_commands.json`.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

pub const DATABASE_FILE: &str = "compile_commands.json";

/// One translation unit; only the fields needed to locate the source
#[derive(Debug, Deserialize)]
pub struct CompileCommand {
    pub directory: String,
    pub file: String,
}

impl CompileCommand {
    pub fn absolute_file(&self) -> PathBuf {
        make_absolute(Path::new(&self.file), Path::new(&self.directory))
    }
}

/// Join a relative path onto `directory` and normalize `.`/`..` lexically.
pub fn make_absolute(file: &Path, directory: &Path) -> PathBuf {
    if file.is_absolute() {
        return file.to_path_buf();
    }
    normalize(&directory.join(file))
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Find the database in `start` or the nearest ancestor that has one
pub fn find_compilation_database(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(DATABASE_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            // Reached filesystem root
            return None;
        }
    }
}

/// Resolve the database path for an optional build directory
pub fn locate(build_path: Option<&Path>) -> Result<PathBuf> {
    match build_path {
        Some(dir) => {
            let candidate = dir.join(DATABASE_FILE);
            if candidate.is_file() {
                Ok(candidate)
            } else {
                Err(anyhow!(
                    "could not find {} in '{}'",
                    DATABASE_FILE,
                    dir.display()
                ))
            }
        }
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            find_compilation_database(&cwd).ok_or_else(|| {
                anyhow!(
                    "could not find {} in '{}' or any parent directory; pass -cpp FILES or -p BUILD_PATH",
                    DATABASE_FILE,
                    cwd.display()
                )
            })
        }
    }
}

pub fn parse(content: &str) -> Result<Vec<CompileCommand>> {
    serde_json::from_str(content).context("Malformed compilation database")
}

/// Absolute source paths listed in the database, in file order
pub fn load_files(database: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(database)
        .with_context(|| format!("Failed to read compilation database: {}", database.display()))?;
    let commands = parse(&content)
        .with_context(|| format!("In {}", database.display()))?;

    Ok(commands
        .iter()
        .map(|command| command.absolute_file().to_string_lossy().into_owned())
        .collect())
}
