//! stackprobe - technology composition scanner for source trees
//!
//! Walks a directory tree, recognizes the components it contains (npm
//! packages, Cargo crates, Go modules, Maven and Gradle projects, compose
//! services and so on) and records which technologies each one uses, with
//! the evidence for every match.
//!
//! # Core Concepts
//!
//! - **Rule catalog**: declarative YAML rules mapping file names, globs,
//!   extensions, content patterns, dependencies and env variables to techs
//! - **Detectors**: per-ecosystem manifest readers that produce payload
//!   fragments, either virtual (merged into the current node) or named
//!   (a new child component)
//! - **Payload tree**: the mutable builder the engine fills during the walk,
//!   frozen into an immutable [`Component`] tree with reproducible ids
//! - **Aggregation**: a flat, deduplicated projection of the frozen tree
//!
//! # Example Usage
//!
//! ```no_run
//! use stackprobe::{DetectorRegistry, RealFileSystem, RuleCatalog, Scanner};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let scanner = Scanner::new(
//!     Arc::new(RealFileSystem::new()),
//!     Arc::new(RuleCatalog::builtin()?),
//!     Arc::new(DetectorRegistry::with_defaults()),
//! );
//! let report = scanner.scan(Path::new("."))?;
//! for component in report.tree.iter() {
//!     println!("{} {:?}", component.name(), component.techs().keys());
//! }
//! let summary = report.aggregate();
//! println!("{} components", summary.components);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`rules`]: rule model, loading and matching
//! - [`detectors`]: manifest detectors and their registry
//! - [`engine`]: the traversal engine
//! - [`payload`], [`component`], [`identity`]: builder tree, frozen tree, ids
//! - [`aggregate`]: flat summary
//! - [`exclude`], [`vcs`]: exclusion scopes and repository identity
//! - [`fs`]: storage provider abstraction

pub mod aggregate;
pub mod cli;
pub mod component;
pub mod config;
pub mod dependencies;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod exclude;
pub mod fs;
pub mod identity;
pub mod languages;
pub mod license;
pub mod payload;
pub mod progress;
pub mod rules;
pub mod util;
pub mod vcs;

pub use aggregate::AggregateSummary;
pub use component::{Component, Edge, OutputFormat, ScanCounters, ScanMetadata, ScanReport};
pub use config::{ConfigError, StackprobeConfig};
pub use detectors::{ComponentDetector, DetectionContext, DetectorRegistry};
pub use engine::{ScanConfig, Scanner};
pub use error::{RuleError, RuleLoadError, ScanError};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use payload::{Dependency, Fragment, License, Payload, RepositoryInfo};
pub use progress::{LoggingHandler, NoOpHandler, ProgressHandler, ScanEvent};
pub use rules::{Rule, RuleCatalog, RuleSource};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
