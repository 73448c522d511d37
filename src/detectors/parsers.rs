//! Reusable manifest dependency parsers.

use crate::payload::Dependency;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;

pub trait DependencyParser: Send + Sync {
    fn parse(&self, content: &str) -> Result<Vec<Dependency>>;
}

/// Walk a dotted key path (`tool.poetry.dependencies`) through a TOML value.
pub fn toml_path<'v>(value: &'v toml::Value, path: &str) -> Option<&'v toml::Value> {
    path.split('.').try_fold(value, |v, key| v.get(key))
}

fn toml_version(value: &toml::Value) -> Option<String> {
    if let Some(version) = value.as_str() {
        return Some(version.to_string());
    }
    let table = value.as_table()?;
    table
        .get("version")
        .or_else(|| table.get("tag"))
        .or_else(|| table.get("rev"))
        .and_then(|v| v.as_str())
        .map(String::from)
}

/// Tables of `name = version | { version = .. }` entries.
pub struct TomlDependencyParser {
    pub ecosystem: &'static str,
    pub dependencies_keys: &'static [&'static str],
    /// Entries that are not packages, such as Poetry's `python`
    pub skip: &'static [&'static str],
}

impl TomlDependencyParser {
    pub fn parse_value(&self, parsed: &toml::Value) -> Vec<Dependency> {
        let mut dependencies = Vec::new();
        let mut seen = HashSet::new();

        for key in self.dependencies_keys {
            let Some(table) = toml_path(parsed, key).and_then(|v| v.as_table()) else {
                continue;
            };
            for (name, value) in table {
                if self.skip.contains(&name.as_str()) || !seen.insert(name.clone()) {
                    continue;
                }
                let name = value
                    .get("package")
                    .and_then(|p| p.as_str())
                    .unwrap_or(name);
                dependencies.push(Dependency::new(self.ecosystem, name, toml_version(value)));
            }
        }
        dependencies
    }
}

impl DependencyParser for TomlDependencyParser {
    fn parse(&self, content: &str) -> Result<Vec<Dependency>> {
        let parsed: toml::Value = toml::from_str(content).context("Invalid TOML manifest")?;
        Ok(self.parse_value(&parsed))
    }
}

/// Objects of `"name": "version"` entries.
pub struct JsonDependencyParser {
    pub ecosystem: &'static str,
    pub dependencies_keys: &'static [&'static str],
}

impl JsonDependencyParser {
    pub fn parse_value(&self, parsed: &serde_json::Value) -> Vec<Dependency> {
        let mut dependencies = Vec::new();
        let mut seen = HashSet::new();

        for key in self.dependencies_keys {
            let Some(entries) = parsed.get(key).and_then(|v| v.as_object()) else {
                continue;
            };
            for (name, version) in entries {
                if !seen.insert(name.clone()) {
                    continue;
                }
                let version = version.as_str().map(|s| s.to_string());
                dependencies.push(Dependency::new(self.ecosystem, name.clone(), version));
            }
        }
        dependencies
    }
}

impl DependencyParser for JsonDependencyParser {
    fn parse(&self, content: &str) -> Result<Vec<Dependency>> {
        let parsed: serde_json::Value = serde_json::from_str(content).context("Invalid JSON manifest")?;
        Ok(self.parse_value(&parsed))
    }
}

/// One dependency per matching line: group 1 is the name, group 2 the
/// optional version.
pub struct RegexDependencyParser {
    pub ecosystem: &'static str,
    pub line_pattern: Regex,
}

impl DependencyParser for RegexDependencyParser {
    fn parse(&self, content: &str) -> Result<Vec<Dependency>> {
        let mut dependencies = Vec::new();
        let mut seen = HashSet::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some(caps) = self.line_pattern.captures(line) else {
                continue;
            };
            let Some(name) = caps.get(1).map(|m| m.as_str().to_string()) else {
                continue;
            };
            if !seen.insert(name.clone()) {
                continue;
            }
            let version = caps
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .filter(|v| !v.is_empty());
            dependencies.push(Dependency::new(self.ecosystem, name, version));
        }
        Ok(dependencies)
    }
}

/// Name and version spec of a PEP 508 requirement (`requests[socks]>=2.31`).
pub fn parse_pep508(requirement: &str) -> Option<(String, Option<String>)> {
    let requirement = requirement.split(';').next()?.trim();
    let name_end = requirement
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .unwrap_or(requirement.len());
    let name = &requirement[..name_end];
    if name.is_empty() {
        return None;
    }
    let rest = requirement[name_end..].trim();
    let rest = match rest.strip_prefix('[') {
        Some(extras) => extras.split_once(']').map(|(_, r)| r.trim()).unwrap_or(""),
        None => rest,
    };
    let version = (!rest.is_empty()).then(|| rest.trim_start_matches('(').trim_end_matches(')').trim().to_string());
    Some((name.to_ascii_lowercase(), version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_parser_tables_and_renames() {
        let parser = TomlDependencyParser {
            ecosystem: "cargo",
            dependencies_keys: &["dependencies", "dev-dependencies"],
            skip: &[],
        };
        let deps = parser
            .parse(
                r#"
[dependencies]
serde = { version = "1.0", features = ["derive"] }
tokio = "1"
pg = { package = "tokio-postgres", version = "0.7" }
local = { path = "../local" }

[dev-dependencies]
tokio = "1"
tempfile = "3"
"#,
            )
            .unwrap();

        let names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["local", "tokio-postgres", "serde", "tokio", "tempfile"]);
        assert_eq!(deps[2].version.as_deref(), Some("1.0"));
        assert_eq!(deps[0].version, None);
    }

    #[test]
    fn test_toml_parser_invalid() {
        let parser = TomlDependencyParser {
            ecosystem: "cargo",
            dependencies_keys: &["dependencies"],
            skip: &[],
        };
        assert!(parser.parse("[dependencies\nfoo =").is_err());
    }

    #[test]
    fn test_json_parser_deduplicates_across_sections() {
        let parser = JsonDependencyParser {
            ecosystem: "npm",
            dependencies_keys: &["dependencies", "devDependencies"],
        };
        let deps = parser
            .parse(r#"{"dependencies": {"react": "^18.2.0"}, "devDependencies": {"react": "18", "vite": "5"}}"#)
            .unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].version.as_deref(), Some("^18.2.0"));
    }

    #[test]
    fn test_regex_parser() {
        let parser = RegexDependencyParser {
            ecosystem: "python",
            line_pattern: Regex::new(r"^([A-Za-z0-9_.\-]+)\s*(?:\[[^\]]*\])?\s*([<>=!~].*)?$").unwrap(),
        };
        let deps = parser.parse("# comment\nflask==3.0.0\nrequests\n-r other.txt\n").unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].version.as_deref(), Some("==3.0.0"));
        assert_eq!(deps[1].version, None);
    }

    #[test]
    fn test_parse_pep508() {
        assert_eq!(
            parse_pep508("Requests[socks] >= 2.31 ; python_version > '3.8'"),
            Some(("requests".to_string(), Some(">= 2.31".to_string())))
        );
        assert_eq!(parse_pep508("django"), Some(("django".to_string(), None)));
        assert_eq!(parse_pep508(">=1"), None);
    }
}
