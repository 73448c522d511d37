#![allow(dead_code)]

use anyhow::Result;
use stackprobe::fs::{DirEntry, FileMetadata};
use stackprobe::progress::{ProgressHandler, ScanEvent};
use stackprobe::{DetectorRegistry, FileSystem, MockFileSystem, RuleCatalog, Scanner};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn get_stackprobe_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_stackprobe"))
}

pub fn scanner_with(fs: Arc<dyn FileSystem>) -> Scanner {
    Scanner::new(
        fs,
        Arc::new(RuleCatalog::builtin().unwrap()),
        Arc::new(DetectorRegistry::with_defaults()),
    )
}

pub fn mock_scanner(fs: MockFileSystem) -> Scanner {
    scanner_with(Arc::new(fs))
}

/// Collects every event it sees.
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<ScanEvent>>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<ScanEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressHandler for RecordingHandler {
    fn on_event(&self, event: &ScanEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Wraps another provider, returning every listing in reverse order and
/// recording which files were read.
pub struct ReversingFileSystem<F> {
    inner: F,
    reads: Mutex<Vec<PathBuf>>,
    listings: AtomicUsize,
}

impl<F: FileSystem> ReversingFileSystem<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            reads: Mutex::new(Vec::new()),
            listings: AtomicUsize::new(0),
        }
    }

    /// How many reads hit a path ending in `suffix`.
    pub fn reads_of(&self, suffix: &str) -> usize {
        self.reads
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.ends_with(suffix))
            .count()
    }

    pub fn listing_count(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    fn record(&self, path: &Path) {
        self.reads.lock().unwrap().push(path.to_path_buf());
    }
}

impl<F: FileSystem> FileSystem for ReversingFileSystem<F> {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        self.inner.metadata(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.record(path);
        self.inner.read(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.record(path);
        self.inner.read_to_string(path)
    }

    fn read_bytes(&self, path: &Path, max_bytes: usize) -> Result<Vec<u8>> {
        self.record(path);
        self.inner.read_bytes(path, max_bytes)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.inner.read_dir(path)?;
        entries.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(entries)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        self.inner.canonicalize(path)
    }
}

/// A small three-package tree used by several suites.
pub fn sample_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file(
        "package.json",
        r#"{"name": "shop", "devDependencies": {"typescript": "^5.0.0"}}"#,
    );
    fs.add_file("package-lock.json", "{}");
    fs.add_file(
        "web/package.json",
        r#"{"name": "web", "dependencies": {"react": "^18.2.0", "pg": "^8.0.0"}}"#,
    );
    fs.add_file("web/src/App.tsx", "export const App = () => null;");
    fs.add_file("web/src/index.ts", "import './App';");
    fs.add_file(
        "api/Cargo.toml",
        "[package]\nname = \"api\"\nversion = \"0.1.0\"\n\n[dependencies]\naxum = \"0.7\"\nredis = \"0.25\"\n",
    );
    fs.add_file("api/src/main.rs", "fn main() {}");
    fs.add_file(".env.example", "REDIS_URL=redis://localhost\n");
    fs
}
