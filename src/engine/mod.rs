//! Traversal engine.
//!
//! [`Scanner`] walks a source tree depth-first through the storage provider,
//! runs every registered detector and the rule catalog on each directory,
//! and merges the results into a builder tree that is frozen once the walk
//! ends. Only failures at the scan root are fatal; anything below it is
//! logged, counted and skipped.

mod walk;

use crate::component::{OutputFormat, ScanMetadata, ScanReport};
use crate::detectors::DetectorRegistry;
use crate::error::ScanError;
use crate::exclude::ExclusionStack;
use crate::fs::{DirEntry, FileSystem};
use crate::identity::{multi_root_id, normalize_relative_path, IdentityAssigner, RootIdentity};
use crate::payload::Payload;
use crate::progress::{NoOpHandler, ProgressHandler, ScanEvent};
use crate::rules::RuleCatalog;
use crate::vcs::RepositoryResolver;
use chrono::Utc;
use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use walk::Walk;

/// Directory names excluded unless the caller says otherwise.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "node_modules",
    ".venv",
    "venv",
    "__pycache__",
    "target",
    ".idea",
    ".vscode",
];

pub const DEFAULT_MAX_CONTENT_BYTES: usize = 512 * 1024;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Global exclude patterns, gitignore syntax, rooted at the scan root
    pub exclude: Vec<String>,
    /// Per-directory ignore file names
    pub ignore_files: Vec<String>,
    /// Read cap for content-regex matching
    pub max_content_bytes: usize,
    /// Deepest directory level visited, the scan root being 0
    pub max_depth: Option<usize>,
    /// Root identity override
    pub id: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            ignore_files: vec![".gitignore".to_string()],
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            max_depth: None,
            id: None,
        }
    }
}

pub struct Scanner {
    fs: Arc<dyn FileSystem>,
    catalog: Arc<RuleCatalog>,
    registry: Arc<DetectorRegistry>,
    config: ScanConfig,
    progress: Arc<dyn ProgressHandler>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Scanner {
    pub fn new(fs: Arc<dyn FileSystem>, catalog: Arc<RuleCatalog>, registry: Arc<DetectorRegistry>) -> Self {
        Self {
            fs,
            catalog,
            registry,
            config: ScanConfig::default(),
            progress: Arc::new(NoOpHandler),
            cancel: None,
        }
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    /// Flag polled before each directory visit. Once set, the walk stops and
    /// the partial tree is returned with `cancelled` set in its metadata.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Scan the whole tree below `root`.
    pub fn scan(&self, root: &Path) -> Result<ScanReport, ScanError> {
        self.run(root, &[])
    }

    /// Scan only the named subfolders of `root`, as one tree.
    ///
    /// The root id covers the sorted subfolder set, so argument order does
    /// not matter but a different set yields a different id.
    pub fn scan_multi<S: AsRef<str>>(&self, root: &Path, subfolders: &[S]) -> Result<ScanReport, ScanError> {
        let mut names: Vec<String> = subfolders
            .iter()
            .map(|s| normalize_relative_path(s.as_ref()))
            .collect();
        names.sort();
        names.dedup();
        if names.is_empty() {
            return self.run(root, &[]);
        }
        self.run(root, &names)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    fn emit(&self, event: ScanEvent) {
        self.progress.on_event(&event);
    }

    fn resolve_root(&self, root: &Path) -> Result<PathBuf, ScanError> {
        if !self.fs.exists(root) {
            return Err(ScanError::RootNotFound(root.to_path_buf()));
        }
        if !self.fs.is_dir(root) {
            return Err(ScanError::RootNotDirectory(root.to_path_buf()));
        }
        Ok(self
            .fs
            .canonicalize(root)
            .unwrap_or_else(|_| root.to_path_buf()))
    }

    fn resolve_subfolders(&self, root: &Path, names: &[String]) -> Result<Vec<PathBuf>, ScanError> {
        names
            .iter()
            .map(|name| {
                let invalid = || ScanError::InvalidSubfolder {
                    root: root.to_path_buf(),
                    name: name.clone(),
                };
                let relative = Path::new(name);
                let escapes = relative
                    .components()
                    .any(|c| !matches!(c, PathComponent::Normal(_)));
                if name == "." || escapes {
                    return Err(invalid());
                }
                let path = root.join(relative);
                if self.fs.is_dir(&path) {
                    Ok(path)
                } else {
                    Err(invalid())
                }
            })
            .collect()
    }

    fn list_root(&self, root: &Path) -> Result<Vec<DirEntry>, ScanError> {
        let mut listing = self
            .fs
            .read_dir(root)
            .map_err(|e| ScanError::RootUnreadable {
                path: root.to_path_buf(),
                reason: format!("{:#}", e),
            })?;
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    fn run(&self, root: &Path, subfolders: &[String]) -> Result<ScanReport, ScanError> {
        let started_at = Utc::now();
        let start = Instant::now();

        let root = self.resolve_root(root)?;
        let subfolder_paths = self.resolve_subfolders(&root, subfolders)?;
        let listing = self.list_root(&root)?;

        info!(
            root = %root.display(),
            subfolders = subfolders.len(),
            detectors = self.registry.len(),
            rules = self.catalog.len(),
            "Starting scan"
        );
        self.emit(ScanEvent::ScanStarted { root: root.clone() });

        let fs = self.fs.as_ref();
        let mut repositories = RepositoryResolver::new();
        let repo_root = repositories.discover(fs, &root);
        let repository = repo_root.as_deref().and_then(|r| repositories.identity(fs, r));

        let mut exclusions =
            ExclusionStack::new(&root, &self.config.exclude).with_ignore_files(self.config.ignore_files.clone());
        if let Some(repo_root) = &repo_root {
            let patterns = repositories.local_excludes(fs, repo_root);
            exclusions = exclusions.with_vcs_excludes(repo_root, &patterns);
        }

        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        let mut tree = Payload::new(root_name, ".");
        tree.repository = repository.clone();

        let mut walk = Walk::new(self, root.clone(), exclusions, repositories);
        if subfolder_paths.is_empty() {
            walk.visit_listing(&root, 0, listing, &mut tree, repo_root.as_deref());
        } else {
            walk.visit_subfolders(&root, listing, &subfolder_paths, &mut tree, repo_root.as_deref());
        }
        let (counters, cancelled, computations) = walk.finish();

        let relative_to_repository = repo_root.as_deref().map(|r| {
            root.strip_prefix(r)
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let repository_key = repository
            .as_ref()
            .and_then(|info| info.remote_url.as_deref())
            .zip(relative_to_repository.as_deref());
        let identity = RootIdentity::resolve(self.config.id.as_deref(), repository_key, &root);
        let root_id = match &identity {
            RootIdentity::Override(id) => id.clone(),
            _ if !subfolders.is_empty() => multi_root_id(&identity.id(), subfolders),
            _ => identity.id(),
        };
        debug!(root_id = %root_id, identity = ?identity, repository_reads = computations, "Root identity resolved");

        let component = IdentityAssigner::new(root_id).freeze(tree);
        let duration = start.elapsed();
        let metadata = ScanMetadata {
            format: OutputFormat::Full,
            version: crate::VERSION.to_string(),
            root: root.display().to_string(),
            subfolders: subfolders.to_vec(),
            started_at,
            duration_ms: duration.as_millis() as u64,
            counters,
            cancelled,
        };
        let report = ScanReport {
            metadata,
            tree: component,
        };

        self.emit(ScanEvent::ScanCompleted {
            components: report.component_count(),
            directories: counters.directories_visited,
            duration,
            cancelled,
        });
        Ok(report)
    }
}
