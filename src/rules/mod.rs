//! Rule catalog: declarative technology-matching specifications.
//!
//! Rules are loaded once at startup from YAML sources (an embedded built-in
//! set plus optional user directories), validated eagerly into strongly-typed
//! [`Rule`] records, and never mutated afterwards. A rule that fails
//! validation is rejected on its own; only a source that cannot be parsed at
//! all aborts the load.
//!
//! # Example
//!
//! ```
//! use stackprobe::rules::{RuleCatalog, RuleSource};
//!
//! let catalog = RuleCatalog::load(&[RuleSource::new(
//!     "custom.yaml",
//!     "- { tech: pg, name: PostgreSQL, type: db, dependencies: [{ type: npm, name: pg }] }",
//! )])
//! .unwrap();
//!
//! let matches = catalog.match_dependencies(&["pg"], "npm");
//! assert_eq!(matches["pg"], vec!["matched dependency: pg".to_string()]);
//! ```

mod catalog;
mod matcher;
mod model;

pub use catalog::{RuleCatalog, RuleSource};
pub use matcher::{is_env_file, parse_env_names, ListingMatches, TechMatches};
pub(crate) use matcher::add_reason;
pub use model::{ContentMatcher, DependencyPattern, NamePattern, Rule};
