//! Git repository discovery and identity, read through the storage provider.
//!
//! Only the on-disk layout is consulted (`HEAD`, loose refs, `packed-refs`,
//! `config`); no git binary or library is involved, so the same code works
//! against an in-memory tree.

use crate::exclude::parse_ignore_lines;
use crate::fs::FileSystem;
use crate::identity::sanitize_remote_url;
use crate::payload::RepositoryInfo;
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DOT_GIT: &str = ".git";

/// Repository lookups with two read-through caches: repository root by
/// directory, and identity by repository root.
#[derive(Debug, Default)]
pub struct RepositoryResolver {
    root_by_path: HashMap<PathBuf, Option<PathBuf>>,
    identity_by_root: HashMap<PathBuf, Option<RepositoryInfo>>,
    computations: usize,
}

impl RepositoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nearest repository root at or above `dir`.
    pub fn discover(&mut self, fs: &dyn FileSystem, dir: &Path) -> Option<PathBuf> {
        if let Some(cached) = self.root_by_path.get(dir) {
            return cached.clone();
        }
        let mut found = None;
        for ancestor in dir.ancestors() {
            if let Some(cached) = self.root_by_path.get(ancestor) {
                found = cached.clone();
                break;
            }
            if fs.exists(&ancestor.join(DOT_GIT)) {
                found = Some(ancestor.to_path_buf());
                break;
            }
        }
        self.root_by_path.insert(dir.to_path_buf(), found.clone());
        found
    }

    /// Repository root for a directory entered during the walk.
    ///
    /// A `.git` entry in `dir` opens a new boundary; otherwise the parent's
    /// root is inherited.
    pub fn root_for(&mut self, fs: &dyn FileSystem, dir: &Path, inherited: Option<&Path>) -> Option<PathBuf> {
        if let Some(cached) = self.root_by_path.get(dir) {
            return cached.clone();
        }
        let root = if fs.exists(&dir.join(DOT_GIT)) {
            Some(dir.to_path_buf())
        } else {
            inherited.map(Path::to_path_buf)
        };
        self.root_by_path.insert(dir.to_path_buf(), root.clone());
        root
    }

    /// Identity of the repository rooted at `root`, computed once per root.
    pub fn identity(&mut self, fs: &dyn FileSystem, root: &Path) -> Option<RepositoryInfo> {
        if let Some(cached) = self.identity_by_root.get(root) {
            return cached.clone();
        }
        self.computations += 1;
        let identity = match read_repository(fs, root) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Failed to read repository identity");
                None
            }
        };
        self.identity_by_root.insert(root.to_path_buf(), identity.clone());
        identity
    }

    /// How many identities were actually read, cache misses only.
    pub fn computations(&self) -> usize {
        self.computations
    }

    /// Patterns from the repository's `info/exclude`.
    pub fn local_excludes(&self, fs: &dyn FileSystem, root: &Path) -> Vec<String> {
        let Some(git_dir) = git_dir(fs, root) else {
            return Vec::new();
        };
        let path = common_dir(fs, &git_dir).join("info").join("exclude");
        if !fs.is_file(&path) {
            return Vec::new();
        }
        match fs.read_to_string(&path) {
            Ok(content) => parse_ignore_lines(&content),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read local exclude file");
                Vec::new()
            }
        }
    }
}

/// The git directory of a checkout: `.git` itself, or the target of a
/// `gitdir:` file (worktrees, submodules).
fn git_dir(fs: &dyn FileSystem, root: &Path) -> Option<PathBuf> {
    let dot_git = root.join(DOT_GIT);
    if fs.is_dir(&dot_git) {
        return Some(dot_git);
    }
    if fs.is_file(&dot_git) {
        let content = fs.read_to_string(&dot_git).ok()?;
        let target = content.trim().strip_prefix("gitdir:")?.trim();
        return Some(resolve_relative(root, Path::new(target)));
    }
    None
}

/// `target` against `base`, with `..` resolved lexically.
fn resolve_relative(base: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        return target.to_path_buf();
    }
    let mut resolved = base.to_path_buf();
    for component in target.components() {
        match component {
            std::path::Component::ParentDir => {
                resolved.pop();
            }
            std::path::Component::CurDir => {}
            other => resolved.push(other),
        }
    }
    resolved
}

/// Shared directory holding refs and config for linked worktrees.
fn common_dir(fs: &dyn FileSystem, git_dir: &Path) -> PathBuf {
    let pointer = git_dir.join("commondir");
    if fs.is_file(&pointer) {
        if let Ok(content) = fs.read_to_string(&pointer) {
            return resolve_relative(git_dir, Path::new(content.trim()));
        }
    }
    git_dir.to_path_buf()
}

pub fn read_repository(fs: &dyn FileSystem, root: &Path) -> Result<RepositoryInfo> {
    let git_dir = git_dir(fs, root).ok_or_else(|| anyhow!("No git directory under {}", root.display()))?;
    let common = common_dir(fs, &git_dir);

    let head_path = git_dir.join("HEAD");
    let head = fs
        .read_to_string(&head_path)
        .with_context(|| format!("Failed to read {}", head_path.display()))?;
    let head = head.trim();

    let mut info = RepositoryInfo::default();
    if let Some(reference) = head.strip_prefix("ref:") {
        let reference = reference.trim();
        info.branch = Some(
            reference
                .strip_prefix("refs/heads/")
                .unwrap_or(reference)
                .to_string(),
        );
        info.commit = resolve_ref(fs, &git_dir, &common, reference);
    } else if is_object_id(head) {
        info.commit = Some(head.to_string());
    }

    let config_path = common.join("config");
    if fs.is_file(&config_path) {
        let config = fs
            .read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        info.remote_url = parse_remote_url(&config).map(|url| sanitize_remote_url(&url));
    }

    debug!(root = %root.display(), branch = ?info.branch, "Repository identity read");
    Ok(info)
}

fn is_object_id(value: &str) -> bool {
    (value.len() == 40 || value.len() == 64) && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn resolve_ref(fs: &dyn FileSystem, git_dir: &Path, common: &Path, reference: &str) -> Option<String> {
    for dir in [git_dir, common] {
        let loose = dir.join(reference);
        if fs.is_file(&loose) {
            if let Ok(content) = fs.read_to_string(&loose) {
                let id = content.trim();
                if is_object_id(id) {
                    return Some(id.to_string());
                }
            }
        }
    }

    let packed = fs.read_to_string(&common.join("packed-refs")).ok()?;
    packed
        .lines()
        .filter(|l| !l.starts_with('#') && !l.starts_with('^'))
        .filter_map(|l| l.split_once(' '))
        .find(|(_, name)| name.trim() == reference)
        .map(|(id, _)| id.to_string())
}

/// `url` of `[remote "origin"]`, or of the first remote when there is no origin.
pub fn parse_remote_url(config: &str) -> Option<String> {
    let mut section: Option<String> = None;
    let mut first: Option<String> = None;

    for line in config.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            section = line
                .trim_start_matches('[')
                .trim_end_matches(']')
                .strip_prefix("remote ")
                .map(|name| name.trim().trim_matches('"').to_string());
            continue;
        }
        let Some(remote) = section.as_deref() else {
            continue;
        };
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() != "url" {
            continue;
        }
        let value = value.trim().to_string();
        if remote == "origin" {
            return Some(value);
        }
        if first.is_none() {
            first = Some(value);
        }
    }
    first
}
