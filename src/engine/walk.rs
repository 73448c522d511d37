use super::Scanner;
use crate::component::ScanCounters;
use crate::dependencies::DependencyMatcher;
use crate::detectors::DetectionContext;
use crate::exclude::ExclusionStack;
use crate::fs::DirEntry;
use crate::identity::normalize_relative_path;
use crate::languages::count_languages;
use crate::license::add_license_evidence;
use crate::payload::{Fragment, Payload};
use crate::progress::{ScanEvent, SkipReason};
use crate::vcs::RepositoryResolver;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Mutable state of one scan. Owned by a single walk and never shared with
/// detectors or the rule catalog.
pub(super) struct Walk<'s> {
    scanner: &'s Scanner,
    root: PathBuf,
    exclusions: ExclusionStack,
    repositories: RepositoryResolver,
    visited: HashSet<PathBuf>,
    counters: ScanCounters,
    cancelled: bool,
}

impl<'s> Walk<'s> {
    pub(super) fn new(
        scanner: &'s Scanner,
        root: PathBuf,
        exclusions: ExclusionStack,
        repositories: RepositoryResolver,
    ) -> Self {
        Self {
            scanner,
            root,
            exclusions,
            repositories,
            visited: HashSet::new(),
            counters: ScanCounters::default(),
            cancelled: false,
        }
    }

    /// Counters, whether the walk was cancelled, and how many repository
    /// identities were read.
    pub(super) fn finish(self) -> (ScanCounters, bool, usize) {
        (self.counters, self.cancelled, self.repositories.computations())
    }

    fn poll_cancel(&mut self) -> bool {
        if !self.cancelled && self.scanner.is_cancelled() {
            debug!("Cancellation requested, no further directories will be entered");
            self.cancelled = true;
        }
        self.cancelled
    }

    fn relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) => normalize_relative_path(&rel.to_string_lossy()),
            Err(_) => path.display().to_string(),
        }
    }

    fn skip(&mut self, path: &Path, is_dir: bool, reason: SkipReason) {
        if is_dir {
            self.counters.directories_skipped += 1;
        } else {
            self.counters.files_skipped += 1;
        }
        self.scanner.emit(ScanEvent::FileSkipped {
            path: path.to_path_buf(),
            reason,
        });
    }

    /// Directories reached twice, through a symlink, are walked once.
    fn first_visit(&mut self, dir: &Path) -> bool {
        let canonical = self
            .scanner
            .fs
            .canonicalize(dir)
            .unwrap_or_else(|_| dir.to_path_buf());
        self.visited.insert(canonical)
    }

    /// Visit a subdirectory. A listing failure skips only this subtree.
    fn visit(&mut self, dir: &Path, depth: usize, parent: &mut Payload, inherited_repo: Option<&Path>) {
        if !self.first_visit(dir) {
            debug!(dir = %dir.display(), "Already visited");
            return;
        }
        let mut listing = match self.scanner.fs.read_dir(dir) {
            Ok(listing) => listing,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                self.skip(
                    dir,
                    true,
                    SkipReason::Unreadable {
                        error: format!("{:#}", e),
                    },
                );
                return;
            }
        };
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        self.visit_listing(dir, depth, listing, parent, inherited_repo);
    }

    /// Only the requested subfolders of the root are walked. The root's own
    /// ignore file still scopes them.
    pub(super) fn visit_subfolders(
        &mut self,
        root: &Path,
        listing: Vec<DirEntry>,
        subfolders: &[PathBuf],
        tree: &mut Payload,
        inherited_repo: Option<&Path>,
    ) {
        self.counters.directories_visited += 1;
        self.first_visit(root);
        self.scanner.emit(ScanEvent::EnterDirectory {
            path: root.to_path_buf(),
            depth: 0,
        });
        let scanner = self.scanner;
        self.exclusions.push_dir(scanner.fs.as_ref(), root, &listing);

        for subfolder in subfolders {
            if self.poll_cancel() {
                break;
            }
            self.visit_subfolder(root, subfolder, tree, inherited_repo);
        }

        self.exclusions.pop_dir(root);
        self.scanner.emit(ScanEvent::LeaveDirectory {
            path: root.to_path_buf(),
        });
    }

    /// Walk one requested subfolder with the scopes of every directory
    /// between the root and it in effect. An excluded subfolder, or one below
    /// an excluded directory, is skipped.
    fn visit_subfolder(&mut self, root: &Path, subfolder: &Path, tree: &mut Payload, inherited_repo: Option<&Path>) {
        let scanner = self.scanner;
        let components: Vec<_> = subfolder
            .strip_prefix(root)
            .map(|rel| rel.components().collect())
            .unwrap_or_default();

        let mut current = root.to_path_buf();
        let mut pushed = Vec::new();
        let mut excluded = false;
        for (position, component) in components.iter().enumerate() {
            current.push(component);
            if let Some(layer) = self.exclusions.is_excluded(&current, true) {
                debug!(dir = %current.display(), layer = %layer, "Requested subfolder is excluded");
                self.skip(
                    &current,
                    true,
                    SkipReason::Excluded {
                        layer: layer.to_string(),
                    },
                );
                excluded = true;
                break;
            }
            if position + 1 == components.len() {
                break;
            }
            match scanner.fs.read_dir(&current) {
                Ok(listing) => {
                    if self.exclusions.push_dir(scanner.fs.as_ref(), &current, &listing) {
                        pushed.push(current.clone());
                    }
                }
                Err(e) => warn!(dir = %current.display(), error = %e, "Cannot read ignore files"),
            }
        }

        if !excluded {
            self.visit(subfolder, components.len().max(1), tree, inherited_repo);
        }
        for dir in pushed.iter().rev() {
            self.exclusions.pop_dir(dir);
        }
    }

    /// Process one listed directory, then recurse into its subdirectories.
    ///
    /// `parent` is the current node inherited from above. A detector that
    /// claims the directory supplies the node used for the rest of this
    /// directory and its subtree.
    pub(super) fn visit_listing(
        &mut self,
        dir: &Path,
        depth: usize,
        raw_listing: Vec<DirEntry>,
        parent: &mut Payload,
        inherited_repo: Option<&Path>,
    ) {
        let scanner = self.scanner;
        let fs = scanner.fs.as_ref();
        let catalog = scanner.catalog.as_ref();
        self.counters.directories_visited += 1;
        self.first_visit(dir);
        self.scanner.emit(ScanEvent::EnterDirectory {
            path: dir.to_path_buf(),
            depth,
        });

        self.exclusions.push_dir(fs, dir, &raw_listing);
        let (listing, excluded) = self.exclusions.filter(raw_listing);
        for (entry, layer) in excluded {
            self.skip(
                entry.path(),
                entry.is_dir(),
                SkipReason::Excluded {
                    layer: layer.to_string(),
                },
            );
        }

        let ctx = DetectionContext {
            listing: &listing,
            dir,
            root: &self.root,
            fs,
            matcher: DependencyMatcher::new(catalog),
        };
        let outcome = scanner.registry.detect_all(&ctx);
        let claiming = outcome.claiming_fragment().map(|index| {
            outcome.detected[..index]
                .iter()
                .filter(|d| !d.fragment.is_virtual())
                .count()
        });
        for detected in outcome.detected.iter().filter(|d| !d.fragment.is_virtual()) {
            self.scanner.emit(ScanEvent::ComponentDetected {
                name: detected.fragment.payload().name.clone(),
                detector: detected.detector,
                path: dir.to_path_buf(),
            });
        }
        let (virtuals, named): (Vec<Fragment>, Vec<Fragment>) = outcome
            .detected
            .into_iter()
            .map(|d| d.fragment)
            .partition(Fragment::is_virtual);
        // Virtual fragments belong to the directory's own node, which is the
        // claimed child when there is one.
        let (attached, deferred) = match claiming {
            Some(_) => (parent.absorb(named, catalog), virtuals),
            None => {
                let mut fragments = virtuals;
                fragments.extend(named);
                (parent.absorb(fragments, catalog), Vec::new())
            }
        };
        let claimed = claiming.and_then(|position| attached.get(position).copied());

        let relative_dir = self.relative(dir);
        let mut node: &mut Payload = match claimed {
            Some(index) => &mut parent.children[index],
            None => parent,
        };
        if !deferred.is_empty() {
            node.absorb(deferred, catalog);
        }

        // A nested checkout without a manifest of its own still gets a node.
        let repo_root = self.repositories.root_for(fs, dir, inherited_repo);
        if let Some(repo) = repo_root.as_deref().filter(|r| Some(*r) != inherited_repo) {
            if let Some(info) = self.repositories.identity(fs, repo) {
                if claimed.is_none() {
                    let name = dir
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| relative_dir.clone());
                    let index = node.add_child(Payload::new(name, relative_dir.clone()));
                    node = &mut node.children[index];
                }
                debug!(dir = %dir.display(), remote = ?info.remote_url, "Repository boundary");
                node.repository = Some(info);
            }
        }

        let matches = catalog.match_listing(&listing, fs, scanner.config.max_content_bytes);
        for path in &matches.unreadable {
            self.skip(
                path,
                false,
                SkipReason::Unreadable {
                    error: "content could not be read".to_string(),
                },
            );
        }
        for tech in matches.techs.keys() {
            self.scanner.emit(ScanEvent::RuleMatched {
                tech: tech.clone(),
                path: dir.to_path_buf(),
            });
        }
        node.apply_matches(matches.techs, catalog);

        for (language, count) in count_languages(&listing) {
            node.add_language(&language, count);
        }

        for path in add_license_evidence(node, fs, &listing, &relative_dir) {
            self.skip(
                &path,
                false,
                SkipReason::Unreadable {
                    error: "license file could not be read".to_string(),
                },
            );
        }

        for entry in listing.iter().filter(|e| e.is_dir()) {
            if self.poll_cancel() {
                break;
            }
            if scanner.config.max_depth.map(|max| depth + 1 > max).unwrap_or(false) {
                self.skip(entry.path(), true, SkipReason::MaxDepth);
                continue;
            }
            self.visit(entry.path(), depth + 1, node, repo_root.as_deref());
        }

        self.exclusions.pop_dir(dir);
        self.scanner.emit(ScanEvent::LeaveDirectory {
            path: dir.to_path_buf(),
        });
    }
}
