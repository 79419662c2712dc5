//! File selection predicate
//!
//! A candidate is selected when any of the user's patterns matches at the
//! start of its path. The match need not cover the whole path, so `src/`
//! selects everything under `src`.

use anyhow::{anyhow, Result};
use regex::RegexSet;

/// Pattern reported when no positional patterns are given
pub const MATCH_ALL: &str = ".*";

#[derive(Debug, Clone)]
pub struct FileSelector {
    sources: Vec<String>,
    /// `None` selects every candidate
    set: Option<RegexSet>,
}

impl FileSelector {
    /// Compile all patterns once; an empty list selects everything.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::match_all());
        }

        let sources: Vec<String> = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        for source in &sources {
            if let Err(e) = regex::Regex::new(source) {
                return Err(anyhow!("Invalid file pattern '{}': {}", source, e));
            }
        }

        let anchored: Vec<String> = sources.iter().map(|source| format!("^(?:{})", source)).collect();
        let set = RegexSet::new(&anchored).map_err(|e| anyhow!("Invalid file patterns: {}", e))?;
        Ok(Self {
            sources,
            set: Some(set),
        })
    }

    pub fn match_all() -> Self {
        Self {
            sources: vec![MATCH_ALL.to_string()],
            set: None,
        }
    }

    pub fn is_match(&self, filename: &str) -> bool {
        match &self.set {
            Some(set) => set.is_match(filename),
            None => true,
        }
    }

    /// Candidates that pass the predicate, in input order
    pub fn select<'a>(&'a self, candidates: &'a [String]) -> impl Iterator<Item = &'a String> + 'a {
        candidates.iter().filter(move |name| self.is_match(name))
    }

    /// Patterns as the user wrote them
    pub fn patterns(&self) -> &[String] {
        &self.sources
    }
}
