//! Configuration management for stackprobe
//!
//! Settings come from an optional TOML file, then `STACKPROBE_*` environment
//! variables override individual fields. Every field has a default, so an
//! empty file and no environment give a usable configuration.
//!
//! # Environment Variables
//!
//! - `STACKPROBE_EXCLUDE`: comma-separated global exclude patterns (replaces the list)
//! - `STACKPROBE_RULES_DIR`: extra rule directory, appended to `rule_dirs`
//! - `STACKPROBE_MAX_DEPTH`: traversal depth limit
//! - `STACKPROBE_ID`: root identity override
//!
//! # Example
//!
//! ```toml
//! exclude = [".git", "node_modules", "dist"]
//! rule_dirs = ["./rules"]
//! max_depth = 8
//! ```

use crate::engine::{ScanConfig, DEFAULT_EXCLUDES, DEFAULT_MAX_CONTENT_BYTES};
use crate::error::RuleLoadError;
use crate::fs::FileSystem;
use crate::rules::RuleCatalog;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const EXCLUDE_ENV: &str = "STACKPROBE_EXCLUDE";
pub const RULES_DIR_ENV: &str = "STACKPROBE_RULES_DIR";
pub const MAX_DEPTH_ENV: &str = "STACKPROBE_MAX_DEPTH";
pub const ID_ENV: &str = "STACKPROBE_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Failed to parse an environment override
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackprobeConfig {
    /// Global exclude patterns, gitignore syntax
    pub exclude: Vec<String>,

    /// Per-directory ignore file names
    pub ignore_files: Vec<String>,

    /// Extra rule directories; every `*.yml`/`*.yaml` inside is loaded
    pub rule_dirs: Vec<PathBuf>,

    /// Load the rule catalog shipped with the binary
    pub builtin_rules: bool,

    /// Read cap for content-regex matching, in bytes
    pub max_content_bytes: usize,

    pub max_depth: Option<usize>,

    /// Root identity override
    pub id: Option<String>,
}

impl Default for StackprobeConfig {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            ignore_files: vec![".gitignore".to_string()],
            rule_dirs: Vec::new(),
            builtin_rules: true,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            max_depth: None,
            id: None,
        }
    }
}

impl StackprobeConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Read a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content, path)
    }

    /// File (if any) with environment overrides applied, validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(exclude) = env::var(EXCLUDE_ENV) {
            self.exclude = exclude
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(dir) = env::var(RULES_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.rule_dirs.push(PathBuf::from(dir.trim()));
            }
        }
        if let Ok(depth) = env::var(MAX_DEPTH_ENV) {
            let depth = depth.trim().parse::<usize>().map_err(|e| ConfigError::ParseError {
                field: MAX_DEPTH_ENV.to_string(),
                error: e.to_string(),
            })?;
            self.max_depth = Some(depth);
        }
        if let Ok(id) = env::var(ID_ENV) {
            if !id.trim().is_empty() {
                self.id = Some(id.trim().to_string());
            }
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_content_bytes == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_content_bytes must be greater than zero".to_string(),
            ));
        }
        if self.ignore_files.iter().any(|n| n.is_empty() || n.contains('/')) {
            return Err(ConfigError::ValidationFailed(
                "ignore_files entries must be plain file names".to_string(),
            ));
        }
        if self.id.as_deref().map(|id| id.trim().is_empty()).unwrap_or(false) {
            return Err(ConfigError::ValidationFailed("id must not be blank".to_string()));
        }
        Ok(())
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            exclude: self.exclude.clone(),
            ignore_files: self.ignore_files.clone(),
            max_content_bytes: self.max_content_bytes,
            max_depth: self.max_depth,
            id: self.id.clone(),
        }
    }

    /// Builtin rules (unless disabled) followed by every configured rule
    /// directory, in order. A tech defined twice keeps its first definition.
    pub fn load_catalog(&self, fs: &dyn FileSystem) -> Result<RuleCatalog, RuleLoadError> {
        let mut sources = if self.builtin_rules {
            RuleCatalog::builtin_sources()
        } else {
            Vec::new()
        };
        for dir in &self.rule_dirs {
            sources.extend(RuleCatalog::sources_from_dir(fs, dir)?);
        }
        RuleCatalog::load(&sources)
    }
}

impl fmt::Display for StackprobeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stackprobe Configuration:")?;
        writeln!(f, "  Exclude: {}", self.exclude.join(", "))?;
        writeln!(f, "  Ignore Files: {}", self.ignore_files.join(", "))?;
        for dir in &self.rule_dirs {
            writeln!(f, "  Rule Dir: {}", dir.display())?;
        }
        writeln!(f, "  Builtin Rules: {}", self.builtin_rules)?;
        writeln!(f, "  Max Content Bytes: {}", self.max_content_bytes)?;
        if let Some(depth) = self.max_depth {
            writeln!(f, "  Max Depth: {}", depth)?;
        }
        if let Some(id) = &self.id {
            writeln!(f, "  Id: {}", id)?;
        }
        Ok(())
    }
}
