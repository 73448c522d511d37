//! Per-ecosystem component detectors.
//!
//! A detector recognizes its own manifest file(s) in a filtered directory
//! listing and returns payload fragments: virtual ones merge into the node
//! that asked, named ones become new children. Detectors only read through
//! the storage provider and never touch traversal state.
//!
//! Registration order is fixed by [`DetectorRegistry::with_defaults`] and
//! decides ties when several detectors fill the same slot in one directory.

mod cargo;
mod docker_compose;
mod github_actions;
mod golang;
mod gradle;
mod maven;
mod npm;
pub mod parsers;
mod python;
mod registry;

pub use cargo::CargoDetector;
pub use docker_compose::DockerComposeDetector;
pub use github_actions::GitHubActionsDetector;
pub use golang::GoModDetector;
pub use gradle::GradleDetector;
pub use maven::MavenDetector;
pub use npm::NpmDetector;
pub use python::PythonDetector;
pub use registry::{Detected, DetectionOutcome, DetectorRegistry};

use crate::dependencies::DependencyMatcher;
use crate::fs::{DirEntry, FileSystem};
use crate::identity::normalize_relative_path;
use crate::license::join_relative;
use crate::payload::Fragment;
use anyhow::{Context, Result};
use std::path::Path;

/// Everything a detector may look at for one directory.
pub struct DetectionContext<'a> {
    /// Filtered listing of `dir`
    pub listing: &'a [DirEntry],
    pub dir: &'a Path,
    pub root: &'a Path,
    pub fs: &'a dyn FileSystem,
    pub matcher: DependencyMatcher<'a>,
}

impl<'a> DetectionContext<'a> {
    pub fn file(&self, name: &str) -> Option<&'a DirEntry> {
        self.listing
            .iter()
            .find(|e| e.is_file() && e.file_name() == name)
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.file(name).is_some()
    }

    /// First listed file among `names`, in the order given.
    pub fn first_file(&self, names: &[&str]) -> Option<&'a DirEntry> {
        names.iter().find_map(|n| self.file(n))
    }

    pub fn read(&self, entry: &DirEntry) -> Result<String> {
        self.fs
            .read_to_string(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))
    }

    /// This directory relative to the scan root, `.` for the root itself.
    pub fn relative_dir(&self) -> String {
        match self.dir.strip_prefix(self.root) {
            Ok(rel) => normalize_relative_path(&rel.to_string_lossy()),
            Err(_) => normalize_relative_path(&self.dir.to_string_lossy()),
        }
    }

    /// A file in this directory, relative to the scan root.
    pub fn relative(&self, name: &str) -> String {
        join_relative(&self.relative_dir(), name)
    }

    /// Last path segment of this directory.
    pub fn dir_name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.relative_dir())
    }
}

pub trait ComponentDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether a named fragment from this detector describes the directory
    /// itself, so later matches in the directory and its subtree attach to it.
    fn claims_directory(&self) -> bool {
        true
    }

    /// Fragments for this directory, empty when the detector does not apply.
    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Fragment>>;
}
