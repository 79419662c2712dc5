use anyhow::{anyhow, Context, Result};
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};

/// Project-level configuration file name
pub const PROJECT_CONFIG_NAME: &str = ".tidyrunrc";

const MAX_ALIAS_DEPTH: usize = 10;

/// Configuration file handler for tidyrun
///
/// INI format: a root-level `defaults = <args>` line prepended to every
/// command line, and an `[aliases]` section expanded by `-a NAME`.
#[derive(Debug, Default)]
pub struct ConfigFile {
    pub defaults: Option<String>,
    pub aliases: HashMap<String, String>,
}

impl ConfigFile {
    /// Find project-level .tidyrunrc by walking up directory tree
    pub fn find_project_config() -> Option<PathBuf> {
        let current = env::current_dir().ok()?;
        Self::find_project_config_from(&current)
    }

    pub fn find_project_config_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let config_path = current.join(PROJECT_CONFIG_NAME);
            if config_path.is_file() {
                return Some(config_path);
            }
            if !current.pop() {
                // Reached filesystem root
                return None;
            }
        }
    }

    /// Get list of user config file locations in order of preference
    pub fn get_user_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if cfg!(windows) {
            // 1. %APPDATA%\tidyrun\config.ini
            // 2. %USERPROFILE%\.tidyrunrc
            if let Ok(appdata) = env::var("APPDATA") {
                paths.push(PathBuf::from(appdata).join("tidyrun").join("config.ini"));
            }
            if let Ok(userprofile) = env::var("USERPROFILE") {
                paths.push(PathBuf::from(userprofile).join(PROJECT_CONFIG_NAME));
            }
        } else {
            // 1. $XDG_CONFIG_HOME/tidyrun/config.ini
            // 2. ~/.config/tidyrun/config.ini (XDG fallback)
            // 3. ~/.tidyrunrc
            let xdg_config = env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    env::var("HOME")
                        .map(|h| PathBuf::from(h).join(".config"))
                        .unwrap_or_else(|_| PathBuf::from(".config"))
                });

            paths.push(xdg_config.join("tidyrun").join("config.ini"));

            if let Ok(home) = env::var("HOME") {
                paths.push(PathBuf::from(home).join(PROJECT_CONFIG_NAME));
            }
        }

        paths
    }

    /// Load configuration with proper precedence: project > user > defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // User config first (lowest precedence); only the first existing one
        if let Some(path) = Self::get_user_config_paths().into_iter().find(|p| p.is_file()) {
            config = Self::merge_configs(config, Self::load_from_path(&path)?);
        }

        if let Some(project_path) = Self::find_project_config() {
            config = Self::merge_configs(config, Self::load_from_path(&project_path)?);
        }

        Ok(config)
    }

    /// Load configuration with optional custom config file path
    pub fn load_with_custom_path(custom_path: Option<&str>) -> Result<Self> {
        match custom_path {
            Some(path) => Self::load_from_path(Path::new(path)),
            None => Self::load(),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse_ini_content(&content)
            .with_context(|| format!("In config file: {}", path.display()))
    }

    fn parse_ini_content(content: &str) -> Result<Self> {
        let mut defaults = None;
        let mut aliases = HashMap::new();
        let mut current_section = String::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].trim().to_string();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(anyhow!("line {}: expected 'key = value'", index + 1));
            };
            let (key, value) = (key.trim(), value.trim());

            match current_section.as_str() {
                "" if key == "defaults" => defaults = Some(value.to_string()),
                "aliases" => {
                    aliases.insert(key.to_string(), value.to_string());
                }
                // Unknown keys and sections are ignored
                _ => {}
            }
        }

        Ok(Self { defaults, aliases })
    }

    /// Merge two configuration objects, with the second taking precedence
    fn merge_configs(base: Self, overlay: Self) -> Self {
        Self {
            defaults: overlay.defaults.or(base.defaults),
            aliases: {
                let mut merged = base.aliases;
                merged.extend(overlay.aliases);
                merged
            },
        }
    }

    /// Show configuration information with precedence details
    pub fn show_config(custom_path: Option<&str>) {
        println!("Configuration precedence: CLI > project .tidyrunrc > user config\n");

        if let Some(path) = custom_path {
            println!("Using --config-file {}", path);
        }

        match Self::load_with_custom_path(custom_path) {
            Ok(config) => {
                match &config.defaults {
                    Some(defaults) => println!("Active defaults:\n  defaults = {}", defaults),
                    None => println!("No defaults configured."),
                }

                if !config.aliases.is_empty() {
                    println!("\nActive aliases:");
                    let mut sorted: Vec<_> = config.aliases.iter().collect();
                    sorted.sort_by_key(|(k, _)| k.as_str());
                    for (key, value) in sorted {
                        println!("  {} = {}", key, value);
                    }
                }
            }
            Err(e) => eprintln!("Error loading configuration: {:#}", e),
        }

        println!("\nConfiguration search locations (in precedence order):");
        match Self::find_project_config() {
            Some(path) => println!("  1. Project: {} (found)", path.display()),
            None => println!("  1. Project: {} (searched up directory tree, not found)", PROJECT_CONFIG_NAME),
        }
        for (i, path) in Self::get_user_config_paths().iter().enumerate() {
            let status = if path.is_file() { "(found)" } else { "(not found)" };
            println!("  {}. User: {} {}", i + 2, path.display(), status);
        }

        println!("\nExample configuration file ({}):", PROJECT_CONFIG_NAME);
        println!();
        println!("# Arguments applied to every run");
        println!("defaults = -j 8 -clang-tidy-binary clang-tidy-17");
        println!();
        println!("[aliases]");
        println!("headers = -header-filter='cugl/include/.*'");
        println!("render = -a headers '.*/render/'");
    }

    /// Resolve a single alias, handling recursive references
    pub fn resolve_alias(&self, name: &str, seen: &mut HashSet<String>, depth: usize) -> Result<Vec<String>> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(anyhow!("Alias chain too deep: {} levels", depth));
        }

        if seen.contains(name) {
            return Err(anyhow!("Circular dependency detected in alias: {}", name));
        }

        let alias_value = self
            .aliases
            .get(name)
            .ok_or_else(|| anyhow!("Unknown alias: {}", name))?;

        seen.insert(name.to_string());

        let args = shell_words::split(alias_value)
            .with_context(|| format!("Invalid alias '{}': failed to parse arguments", name))?;
        let result = self.expand(args, seen, depth + 1)?;

        seen.remove(name);
        Ok(result)
    }

    /// Replace every `-a NAME` pair with the alias expansion
    fn expand(&self, args: Vec<String>, seen: &mut HashSet<String>, depth: usize) -> Result<Vec<String>> {
        let mut result = Vec::with_capacity(args.len());
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            if arg == "-a" || arg == "--alias" {
                match args.next() {
                    Some(name) => result.extend(self.resolve_alias(&name, seen, depth)?),
                    None => result.push(arg),
                }
            } else {
                result.push(arg);
            }
        }

        Ok(result)
    }

    /// Process command line arguments, applying defaults and expanding aliases
    pub fn process_args(&self, args: Vec<String>) -> Result<Vec<String>> {
        let mut args = args.into_iter();
        let mut result: Vec<String> = args.next().into_iter().collect(); // program name

        if let Some(defaults) = &self.defaults {
            let default_args = shell_words::split(defaults)
                .with_context(|| "Invalid defaults: failed to parse arguments".to_string())?;
            result.extend(default_args);
        }
        result.extend(args);

        let program = result.first().cloned();
        let rest = result.into_iter().skip(1).collect();
        let mut expanded: Vec<String> = program.into_iter().collect();
        expanded.extend(self.expand(rest, &mut HashSet::new(), 0)?);
        Ok(expanded)
    }
}
