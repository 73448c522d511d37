//! Matching primitives over a filtered directory listing.
//!
//! Every primitive returns `tech -> [reasons]`. Rules are visited in catalog
//! order and, per rule, the first successful primitive wins, so applying the
//! same listing twice always yields the same result.

use super::catalog::RuleCatalog;
use super::model::Rule;
use crate::fs::{DirEntry, FileSystem};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::warn;

/// Technology id mapped to the human-readable reasons it matched.
pub type TechMatches = BTreeMap<String, Vec<String>>;

/// Result of matching a whole listing.
#[derive(Debug, Default)]
pub struct ListingMatches {
    pub techs: TechMatches,
    /// Files whose content could not be read; they contribute nothing.
    pub unreadable: Vec<PathBuf>,
}

pub(crate) fn add_reason(matches: &mut TechMatches, tech: &str, reason: String) {
    let reasons = matches.entry(tech.to_string()).or_default();
    if !reasons.contains(&reason) {
        reasons.push(reason);
    }
}

/// Reads each file at most once per listing.
struct ContentCache<'a> {
    fs: &'a dyn FileSystem,
    max_bytes: usize,
    contents: HashMap<PathBuf, Option<String>>,
    unreadable: Vec<PathBuf>,
}

impl<'a> ContentCache<'a> {
    fn new(fs: &'a dyn FileSystem, max_bytes: usize) -> Self {
        Self {
            fs,
            max_bytes,
            contents: HashMap::new(),
            unreadable: Vec::new(),
        }
    }

    fn get(&mut self, entry: &DirEntry) -> Option<&str> {
        if !self.contents.contains_key(entry.path()) {
            let content = match self.fs.read_bytes(entry.path(), self.max_bytes) {
                Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Failed to read file for content matching");
                    self.unreadable.push(entry.path().to_path_buf());
                    None
                }
            };
            self.contents.insert(entry.path().to_path_buf(), content);
        }
        self.contents.get(entry.path()).and_then(|c| c.as_deref())
    }
}

fn files(listing: &[DirEntry]) -> impl Iterator<Item = &DirEntry> {
    listing.iter().filter(|e| e.is_file())
}

fn content_match(rule: &Rule, listing: &[DirEntry], cache: &mut ContentCache<'_>) -> Option<String> {
    for matcher in &rule.content {
        for entry in files(listing) {
            let ext = entry.extension();
            if !rule.content_applies(matcher, entry.file_name(), ext.as_deref()) {
                continue;
            }
            if let Some(content) = cache.get(entry) {
                if matcher.pattern.is_match(content) {
                    return Some(format!("matched content: {}", entry.file_name()));
                }
            }
        }
    }
    None
}

fn structural_match(rule: &Rule, listing: &[DirEntry]) -> Option<String> {
    let by_name = || files(listing).find_map(|e| rule.match_file_name(e.file_name()));
    let by_glob = || files(listing).find_map(|e| rule.match_glob(e.file_name()));
    let by_ext = || files(listing).find_map(|e| rule.match_extension(e.extension().as_deref()));
    by_name().or_else(by_glob).or_else(by_ext)
}

impl RuleCatalog {
    /// Exact-filename primitive.
    pub fn match_files(&self, listing: &[DirEntry]) -> TechMatches {
        self.collect(|rule| {
            (!rule.content_required)
                .then(|| files(listing).find_map(|e| rule.match_file_name(e.file_name())))
                .flatten()
        })
    }

    /// Glob file-pattern primitive.
    pub fn match_globs(&self, listing: &[DirEntry]) -> TechMatches {
        self.collect(|rule| {
            (!rule.content_required)
                .then(|| files(listing).find_map(|e| rule.match_glob(e.file_name())))
                .flatten()
        })
    }

    /// Extension primitive.
    pub fn match_extensions(&self, listing: &[DirEntry]) -> TechMatches {
        self.collect(|rule| {
            (!rule.content_required)
                .then(|| files(listing).find_map(|e| rule.match_extension(e.extension().as_deref())))
                .flatten()
        })
    }

    /// Content-regex primitive. Content-required rules only fire here.
    pub fn match_content(&self, listing: &[DirEntry], fs: &dyn FileSystem, max_bytes: usize) -> ListingMatches {
        let mut cache = ContentCache::new(fs, max_bytes);
        let techs = self.collect(|rule| content_match(rule, listing, &mut cache));
        ListingMatches {
            techs,
            unreadable: cache.unreadable,
        }
    }

    /// Ecosystem-scoped dependency-name primitive.
    pub fn match_dependencies<S: AsRef<str>>(&self, names: &[S], ecosystem: &str) -> TechMatches {
        let mut matches = TechMatches::new();
        for rule in self.rules_for_ecosystem(ecosystem) {
            if let Some(reason) = names
                .iter()
                .find_map(|n| rule.match_dependency(ecosystem, n.as_ref()))
            {
                add_reason(&mut matches, &rule.tech, reason);
            }
        }
        matches
    }

    /// Environment-variable-name-prefix primitive.
    pub fn match_env<S: AsRef<str>>(&self, variables: &[S]) -> TechMatches {
        self.collect(|rule| variables.iter().find_map(|v| rule.match_env(v.as_ref())))
    }

    /// All listing primitives combined, first successful match per rule.
    ///
    /// For a content-required rule the structural selectors only scope which
    /// files are read; the rule fires when the content regex matches too.
    pub fn match_listing(&self, listing: &[DirEntry], fs: &dyn FileSystem, max_bytes: usize) -> ListingMatches {
        let mut cache = ContentCache::new(fs, max_bytes);

        let mut techs = self.collect(|rule| {
            if rule.content_required {
                return content_match(rule, listing, &mut cache);
            }
            structural_match(rule, listing).or_else(|| content_match(rule, listing, &mut cache))
        });

        let variables = env_variables(listing, &mut cache);
        for (tech, reasons) in self.match_env(variables.as_slice()) {
            if !techs.contains_key(&tech) {
                techs.insert(tech, reasons);
            }
        }

        ListingMatches {
            techs,
            unreadable: cache.unreadable,
        }
    }

    fn collect<F>(&self, mut matcher: F) -> TechMatches
    where
        F: FnMut(&Rule) -> Option<String>,
    {
        let mut matches = TechMatches::new();
        for rule in self.rules() {
            if let Some(reason) = matcher(rule) {
                add_reason(&mut matches, &rule.tech, reason);
            }
        }
        matches
    }
}

pub fn is_env_file(name: &str) -> bool {
    name == ".env" || name.starts_with(".env.") || name.ends_with(".env")
}

/// Variable names declared in dotenv files, in listing order.
fn env_variables(listing: &[DirEntry], cache: &mut ContentCache<'_>) -> Vec<String> {
    let mut variables = Vec::new();
    for entry in files(listing).filter(|e| is_env_file(e.file_name())) {
        if let Some(content) = cache.get(entry) {
            variables.extend(parse_env_names(content));
        }
    }
    variables
}

pub fn parse_env_names(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let l = l.strip_prefix("export ").unwrap_or(l);
            let (name, _) = l.split_once('=')?;
            let name = name.trim();
            (!name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
                .then(|| name.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::rules::RuleSource;
    use std::path::Path;

    fn catalog() -> RuleCatalog {
        RuleCatalog::load(&[RuleSource::new(
            "test.yaml",
            r#"
- tech: docker
  name: Docker
  type: tool
  files: [Dockerfile]
  globs: ["Dockerfile.*"]
- tech: terraform
  name: Terraform
  type: tool
  extensions: [tf]
- tech: jsonschema
  name: JSON Schema
  type: tool
  extensions: [json]
  content: [{ pattern: '"\$schema"' }]
  content_required: true
- tech: postgresql
  name: PostgreSQL
  type: db
  component: true
  dependencies: [{ type: npm, name: pg }, { type: docker, name: "/^postgres/" }]
  env: [POSTGRES_]
- tech: stripe
  name: Stripe
  type: saas
  env: [STRIPE_]
"#,
        )])
        .unwrap()
    }

    fn listing(fs: &MockFileSystem) -> Vec<DirEntry> {
        let mut entries = fs.read_dir(Path::new("/mock")).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    #[test]
    fn test_match_files_and_globs() {
        let fs = MockFileSystem::new();
        fs.add_file("Dockerfile.dev", "FROM node");
        let entries = listing(&fs);
        let catalog = catalog();

        assert!(catalog.match_files(&entries).is_empty());
        let globs = catalog.match_globs(&entries);
        assert_eq!(
            globs["docker"],
            vec!["matched file pattern Dockerfile.*: Dockerfile.dev".to_string()]
        );
    }

    #[test]
    fn test_match_extensions() {
        let fs = MockFileSystem::new();
        fs.add_file("main.TF", "");
        let matches = catalog().match_extensions(&listing(&fs));
        assert_eq!(matches["terraform"], vec!["matched extension: .tf".to_string()]);
    }

    #[test]
    fn test_content_required_needs_both() {
        let fs = MockFileSystem::new();
        fs.add_file("data.json", r#"{"a": 1}"#);
        let catalog = catalog();

        let plain = catalog.match_listing(&listing(&fs), &fs, 1024);
        assert!(!plain.techs.contains_key("jsonschema"));
        assert!(catalog.match_extensions(&listing(&fs)).is_empty());

        fs.add_file("schema.json", r#"{"$schema": "http://json-schema.org/draft-07/schema#"}"#);
        let with_schema = catalog.match_listing(&listing(&fs), &fs, 1024);
        assert_eq!(
            with_schema.techs["jsonschema"],
            vec!["matched content: schema.json".to_string()]
        );
    }

    #[test]
    fn test_content_read_cap() {
        let fs = MockFileSystem::new();
        fs.add_file("schema.json", &format!("{}\"$schema\"", " ".repeat(100)));
        let matches = catalog().match_listing(&listing(&fs), &fs, 50);
        assert!(!matches.techs.contains_key("jsonschema"));
    }

    #[test]
    fn test_first_match_wins_per_rule() {
        let fs = MockFileSystem::new();
        fs.add_file("Dockerfile", "FROM node");
        fs.add_file("Dockerfile.prod", "FROM node");
        let matches = catalog().match_listing(&listing(&fs), &fs, 1024);
        assert_eq!(matches.techs["docker"], vec!["matched file: Dockerfile".to_string()]);
    }

    #[test]
    fn test_match_listing_idempotent() {
        let fs = MockFileSystem::new();
        fs.add_file("Dockerfile", "FROM node");
        fs.add_file("main.tf", "");
        fs.add_file(".env", "STRIPE_KEY=abc\n");
        let catalog = catalog();
        let entries = listing(&fs);

        let first = catalog.match_listing(&entries, &fs, 1024);
        let second = catalog.match_listing(&entries, &fs, 1024);
        assert_eq!(first.techs, second.techs);
        assert_eq!(first.techs.len(), 3);
    }

    #[test]
    fn test_match_dependencies_scoped_by_ecosystem() {
        let catalog = catalog();
        let npm = catalog.match_dependencies(&["express", "pg"], "npm");
        assert_eq!(npm["postgresql"], vec!["matched dependency: pg".to_string()]);

        let docker = catalog.match_dependencies(&["postgres:16-alpine"], "docker");
        assert!(docker.contains_key("postgresql"));

        assert!(catalog.match_dependencies(&["pg"], "cargo").is_empty());
    }

    #[test]
    fn test_env_file_matching() {
        let fs = MockFileSystem::new();
        fs.add_file(
            ".env.example",
            "# comment\nexport POSTGRES_HOST=db\nSTRIPE_SECRET_KEY=\nnot a var\n",
        );
        let matches = catalog().match_listing(&listing(&fs), &fs, 1024);
        assert_eq!(
            matches.techs["postgresql"],
            vec!["matched env: POSTGRES_HOST".to_string()]
        );
        assert!(matches.techs.contains_key("stripe"));
    }

    #[test]
    fn test_unreadable_file_reported() {
        let fs = MockFileSystem::new();
        fs.add_file("schema.json", "{}");
        let mut entries = listing(&fs);
        entries[0].path = PathBuf::from("/mock/gone.json");

        let matches = catalog().match_listing(&entries, &fs, 1024);
        assert_eq!(matches.unreadable, vec![PathBuf::from("/mock/gone.json")]);
    }

    #[test]
    fn test_parse_env_names() {
        assert_eq!(
            parse_env_names("A=1\n  B_2 = x\n#C=3\nbad-name=1\n"),
            vec!["A".to_string(), "B_2".to_string()]
        );
        assert!(is_env_file(".env"));
        assert!(is_env_file(".env.local"));
        assert!(is_env_file("prod.env"));
        assert!(!is_env_file("environment.ts"));
    }
}
