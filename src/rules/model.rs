//! Strongly-typed rule records and their YAML wire form.

use regex::Regex;
use serde::Deserialize;

/// Name pattern used by dependency entries.
///
/// A name wrapped in slashes (`/^@aws-sdk//`) is compiled as a regex,
/// anything else matches exactly.
#[derive(Debug, Clone)]
pub enum NamePattern {
    Exact(String),
    Regex(Regex),
}

impl NamePattern {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.len() > 2 && raw.starts_with('/') && raw.ends_with('/') {
            let inner = &raw[1..raw.len() - 1];
            Regex::new(inner)
                .map(NamePattern::Regex)
                .map_err(|e| format!("invalid dependency regex {:?}: {}", raw, e))
        } else {
            Ok(NamePattern::Exact(raw.to_string()))
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(expected) => expected == name,
            NamePattern::Regex(re) => re.is_match(name),
        }
    }
}

/// Ecosystem-scoped dependency pattern (e.g. npm `pg`, docker `/^postgres/`)
#[derive(Debug, Clone)]
pub struct DependencyPattern {
    pub ecosystem: String,
    pub name: NamePattern,
}

impl DependencyPattern {
    pub fn matches(&self, ecosystem: &str, name: &str) -> bool {
        self.ecosystem == ecosystem && self.name.matches(name)
    }
}

/// Content regex scoped to files selected by extension or exact name.
///
/// Empty `extensions` and `files` fall back to the owning rule's structural
/// selectors.
#[derive(Debug, Clone)]
pub struct ContentMatcher {
    pub pattern: Regex,
    pub extensions: Vec<String>,
    pub files: Vec<String>,
}

/// A validated, immutable technology rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub tech: String,
    pub name: String,
    pub category: String,
    pub is_primary: bool,
    pub creates_component: bool,
    pub creates_edge: bool,
    pub files: Vec<String>,
    pub globs: Vec<glob::Pattern>,
    pub extensions: Vec<String>,
    pub content: Vec<ContentMatcher>,
    pub content_required: bool,
    pub dependencies: Vec<DependencyPattern>,
    pub env_prefixes: Vec<String>,
    pub source: String,
}

impl Rule {
    pub fn match_file_name(&self, name: &str) -> Option<String> {
        self.files
            .iter()
            .any(|f| f == name)
            .then(|| format!("matched file: {}", name))
    }

    pub fn match_glob(&self, name: &str) -> Option<String> {
        self.globs
            .iter()
            .find(|g| g.matches(name))
            .map(|g| format!("matched file pattern {}: {}", g.as_str(), name))
    }

    pub fn match_extension(&self, extension: Option<&str>) -> Option<String> {
        let ext = extension?;
        self.extensions
            .iter()
            .any(|e| e == ext)
            .then(|| format!("matched extension: .{}", ext))
    }

    /// Structural selectors a content matcher applies to.
    pub fn content_applies(&self, matcher: &ContentMatcher, name: &str, ext: Option<&str>) -> bool {
        let (extensions, files) = if matcher.extensions.is_empty() && matcher.files.is_empty() {
            (&self.extensions, &self.files)
        } else {
            (&matcher.extensions, &matcher.files)
        };
        files.iter().any(|f| f == name)
            || ext.map(|e| extensions.iter().any(|x| x == e)).unwrap_or(false)
    }

    pub fn match_dependency(&self, ecosystem: &str, name: &str) -> Option<String> {
        self.dependencies
            .iter()
            .any(|d| d.matches(ecosystem, name))
            .then(|| format!("matched dependency: {}", name))
    }

    pub fn match_env(&self, variable: &str) -> Option<String> {
        self.env_prefixes
            .iter()
            .any(|p| variable.starts_with(p.as_str()))
            .then(|| format!("matched env: {}", variable))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawRule {
    pub tech: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub component: bool,
    #[serde(default)]
    pub edge: bool,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub globs: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub content: Vec<RawContent>,
    #[serde(default)]
    pub content_required: bool,
    #[serde(default)]
    pub dependencies: Vec<RawDependency>,
    #[serde(default)]
    pub env: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawContent {
    pub pattern: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawDependency {
    #[serde(rename = "type")]
    pub ecosystem: Option<String>,
    pub name: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(format!("missing required field `{}`", field)),
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

impl RawRule {
    pub(crate) fn validate(self, source: &str) -> Result<Rule, String> {
        let tech = required(self.tech, "tech")?;
        let name = required(self.name, "name")?;
        let category = required(self.category, "type")?;

        let globs = self
            .globs
            .iter()
            .map(|g| glob::Pattern::new(g).map_err(|e| format!("invalid glob {:?}: {}", g, e)))
            .collect::<Result<Vec<_>, _>>()?;

        let content = self
            .content
            .into_iter()
            .enumerate()
            .map(|(i, c)| {
                let pattern = c
                    .pattern
                    .ok_or_else(|| format!("content entry {} is missing `pattern`", i))?;
                let pattern = Regex::new(&pattern)
                    .map_err(|e| format!("invalid content regex {:?}: {}", pattern, e))?;
                Ok(ContentMatcher {
                    pattern,
                    extensions: c.extensions.iter().map(|e| normalize_extension(e)).collect(),
                    files: c.files,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        let dependencies = self
            .dependencies
            .into_iter()
            .enumerate()
            .map(|(i, d)| {
                let ecosystem = d
                    .ecosystem
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| format!("dependency entry {} is missing `type`", i))?;
                let name = d
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| format!("dependency entry {} is missing `name`", i))?;
                Ok(DependencyPattern {
                    ecosystem,
                    name: NamePattern::parse(&name)?,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        if self.content_required && content.is_empty() {
            return Err("`content_required` is set but no `content` entries exist".to_string());
        }

        Ok(Rule {
            tech,
            name,
            category,
            is_primary: self.primary,
            creates_component: self.component,
            creates_edge: self.edge,
            files: self.files,
            globs,
            extensions: self.extensions.iter().map(|e| normalize_extension(e)).collect(),
            content,
            content_required: self.content_required,
            dependencies,
            env_prefixes: self.env,
            source: source.to_string(),
        })
    }
}
