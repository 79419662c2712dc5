//! Exported fix merging
//!
//! Each invocation writes its suggested fixes to its own YAML file. After the
//! run every file's `Diagnostics` sequence is concatenated into one document
//! that `clang-apply-replacements` can consume.

use anyhow::{anyhow, Context, Result};
use serde_yml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// Top-level key holding fixes in clang-tidy's export format
pub const MERGE_KEY: &str = "Diagnostics";

/// Required by the replacements format but never read by consumers
const MAIN_SOURCE_FILE_KEY: &str = "MainSourceFile";

/// Merge every `*.yaml` under `dir` into `merge_file`.
///
/// Returns the number of diagnostics written. When there is nothing to
/// merge, `merge_file` is left empty.
pub fn merge_replacement_files(dir: &Path, merge_file: &Path) -> Result<usize> {
    let dir_str = dir
        .to_str()
        .ok_or_else(|| anyhow!("Non UTF-8 scratch directory: {}", dir.display()))?;
    // Only the file name is a pattern; brackets or stars in the directory are literal
    let pattern = format!("{}/*.yaml", glob::Pattern::escape(dir_str));

    let mut sources: Vec<_> = glob::glob(&pattern)
        .with_context(|| format!("Invalid replacement file pattern: {}", pattern))?
        .filter_map(|entry| entry.ok())
        .collect();
    sources.sort();

    let mut merged = Vec::new();
    for path in &sources {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read replacement file: {}", path.display()))?;
        merged.extend(
            diagnostics_of(&content)
                .with_context(|| format!("Malformed replacement file: {}", path.display()))?,
        );
    }

    let count = merged.len();
    let output = if merged.is_empty() {
        String::new()
    } else {
        let mut document = Mapping::new();
        document.insert(
            Value::String(MAIN_SOURCE_FILE_KEY.to_string()),
            Value::String(String::new()),
        );
        document.insert(Value::String(MERGE_KEY.to_string()), Value::Sequence(merged));
        serde_yml::to_string(&Value::Mapping(document))
            .context("Failed to serialize merged replacements")?
    };

    fs::write(merge_file, output)
        .with_context(|| format!("Failed to write merged fixes: {}", merge_file.display()))?;

    tracing::debug!(
        files = sources.len(),
        diagnostics = count,
        output = %merge_file.display(),
        "merged exported fixes"
    );
    Ok(count)
}

/// The `Diagnostics` entries of one document; blank documents have none.
fn diagnostics_of(content: &str) -> Result<Vec<Value>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document: Value = serde_yml::from_str(content)?;
    match document {
        Value::Null => Ok(Vec::new()),
        Value::Mapping(mut map) => match map.remove(MERGE_KEY) {
            Some(Value::Sequence(entries)) => Ok(entries),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(anyhow!("'{}' is not a sequence", MERGE_KEY)),
        },
        _ => Err(anyhow!("top level is not a mapping")),
    }
}
