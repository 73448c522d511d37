//! Scoped, gitignore-style exclusion patterns.
//!
//! The stack holds one scope per directory that defines its own ignore file.
//! Scopes are pushed when the walk enters such a directory and popped when it
//! leaves, so a directory's patterns apply to its subtree only. Two layers sit
//! underneath every scope for the whole scan: the configured global excludes
//! and the repository's local exclude file (`.git/info/exclude`).
//!
//! Negation (`!pattern`) lines are dropped. A broad exclude in an ancestor
//! cannot be reversed by a narrower descendant scope.

use crate::fs::{DirEntry, FileSystem};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Which layer excluded a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layer", content = "dir", rename_all = "snake_case")]
pub enum ExcludeLayer {
    VcsLocal,
    Global,
    Scope(PathBuf),
}

impl fmt::Display for ExcludeLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExcludeLayer::VcsLocal => write!(f, "vcs local exclude"),
            ExcludeLayer::Global => write!(f, "global exclude"),
            ExcludeLayer::Scope(dir) => write!(f, "ignore file in {}", dir.display()),
        }
    }
}

struct Layer {
    base: PathBuf,
    matcher: Gitignore,
    /// Also try the bare file name, so anchored patterns match at any depth
    bare_name: bool,
}

impl Layer {
    fn build(base: &Path, patterns: &[String]) -> Option<Self> {
        let mut builder = GitignoreBuilder::new(base);
        let mut added = 0usize;
        for pattern in patterns {
            match builder.add_line(None, pattern) {
                Ok(_) => added += 1,
                Err(e) => warn!(base = %base.display(), pattern = %pattern, error = %e, "Invalid exclude pattern"),
            }
        }
        if added == 0 {
            return None;
        }
        match builder.build() {
            Ok(matcher) => Some(Self {
                base: base.to_path_buf(),
                matcher,
                bare_name: false,
            }),
            Err(e) => {
                warn!(base = %base.display(), error = %e, "Failed to build exclude matcher");
                None
            }
        }
    }

    fn matching_bare_names(mut self) -> Self {
        self.bare_name = true;
        self
    }

    /// Match against the path relative to this layer's base, or the bare name.
    fn matches(&self, path: &Path, is_dir: bool) -> bool {
        let relative = match path.strip_prefix(&self.base) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => return false,
        };
        if self.matcher.matched(relative, is_dir).is_ignore() {
            return true;
        }
        if !self.bare_name {
            return false;
        }
        match path.file_name() {
            Some(name) if Path::new(name) != relative => {
                self.matcher.matched(Path::new(name), is_dir).is_ignore()
            }
            _ => false,
        }
    }
}

/// Parse ignore-file content into pattern lines.
///
/// Blank lines, comments and negations are dropped.
pub fn parse_ignore_lines(content: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    for line in content.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('!') {
            debug!(pattern = %line, "Negated exclude pattern ignored");
            continue;
        }
        patterns.push(line.to_string());
    }
    patterns
}

pub struct ExclusionStack {
    vcs: Option<Layer>,
    global: Option<Layer>,
    scopes: Vec<Layer>,
    ignore_files: Vec<String>,
}

impl ExclusionStack {
    /// Stack with the global layer rooted at the scan root.
    pub fn new(scan_root: &Path, global_patterns: &[String]) -> Self {
        Self {
            vcs: None,
            global: Layer::build(scan_root, global_patterns).map(Layer::matching_bare_names),
            scopes: Vec::new(),
            ignore_files: vec![".gitignore".to_string()],
        }
    }

    /// File names that open a scope in the directory containing them.
    pub fn with_ignore_files(mut self, names: Vec<String>) -> Self {
        self.ignore_files = names;
        self
    }

    /// Install the repository's local-exclude layer.
    pub fn with_vcs_excludes(mut self, repo_root: &Path, patterns: &[String]) -> Self {
        self.vcs = Layer::build(repo_root, patterns);
        self
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Push a scope for `dir` if its listing holds an ignore file with at
    /// least one usable pattern. Returns whether a scope was pushed.
    pub fn push_dir(&mut self, fs: &dyn FileSystem, dir: &Path, listing: &[DirEntry]) -> bool {
        let mut patterns = Vec::new();
        for entry in listing {
            if !entry.is_file() || !self.ignore_files.iter().any(|n| n == entry.file_name()) {
                continue;
            }
            match fs.read_to_string(entry.path()) {
                Ok(content) => patterns.extend(parse_ignore_lines(&content)),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Failed to read ignore file")
                }
            }
        }
        self.push_patterns(dir, &patterns)
    }

    pub fn push_patterns(&mut self, dir: &Path, patterns: &[String]) -> bool {
        match Layer::build(dir, patterns) {
            Some(layer) => {
                debug!(dir = %dir.display(), patterns = patterns.len(), "Exclusion scope pushed");
                self.scopes.push(layer);
                true
            }
            None => false,
        }
    }

    /// Pop the innermost scope if it belongs to `dir`.
    ///
    /// Safe to call for every directory on the way out: directories that
    /// never pushed leave the stack untouched.
    pub fn pop_dir(&mut self, dir: &Path) -> bool {
        if self.scopes.last().map(|s| s.base == dir).unwrap_or(false) {
            self.scopes.pop();
            debug!(dir = %dir.display(), "Exclusion scope popped");
            true
        } else {
            false
        }
    }

    /// Layer excluding `path`, checked from highest precedence down.
    pub fn is_excluded(&self, path: &Path, is_dir: bool) -> Option<ExcludeLayer> {
        if self.vcs.as_ref().map(|l| l.matches(path, is_dir)).unwrap_or(false) {
            return Some(ExcludeLayer::VcsLocal);
        }
        if self.global.as_ref().map(|l| l.matches(path, is_dir)).unwrap_or(false) {
            return Some(ExcludeLayer::Global);
        }
        self.scopes
            .iter()
            .rev()
            .find(|scope| scope.matches(path, is_dir))
            .map(|scope| ExcludeLayer::Scope(scope.base.clone()))
    }

    /// Split a listing into kept entries and excluded ones.
    pub fn filter(&self, listing: Vec<DirEntry>) -> (Vec<DirEntry>, Vec<(DirEntry, ExcludeLayer)>) {
        let mut kept = Vec::with_capacity(listing.len());
        let mut excluded = Vec::new();
        for entry in listing {
            match self.is_excluded(entry.path(), entry.is_dir()) {
                Some(layer) => excluded.push((entry, layer)),
                None => kept.push(entry),
            }
        }
        (kept, excluded)
    }
}
