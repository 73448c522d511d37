use std::path::PathBuf;
use thiserror::Error;

/// Fatal, pre-traversal scan failures.
///
/// Everything that goes wrong below the scan root (an unreadable
/// subdirectory, a file that cannot be read, a manifest a detector cannot
/// parse) is logged and skipped instead of surfacing here.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("Scan root is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    #[error("Scan root cannot be listed: {path}: {reason}")]
    RootUnreadable { path: PathBuf, reason: String },

    #[error("Subfolder {name:?} is not a directory below {root}")]
    InvalidSubfolder { root: PathBuf, name: String },
}

/// A rule source that cannot be used at all. Aborts the catalog load.
#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("Failed to read rule source {source_name}: {reason}")]
    Io { source_name: String, reason: String },

    #[error("Failed to parse rule source {source_name}: {reason}")]
    Parse { source_name: String, reason: String },
}

/// A single rule rejected during validation. The rest of the catalog loads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source_name}[{index}]{}: {reason}", .tech.as_ref().map(|t| format!(" ({})", t)).unwrap_or_default())]
pub struct RuleError {
    pub source_name: String,
    pub index: usize,
    pub tech: Option<String>,
    pub reason: String,
}
