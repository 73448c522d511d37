use super::model::{RawRule, Rule};
use crate::error::{RuleError, RuleLoadError};
use crate::fs::FileSystem;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// A named YAML document holding a list of rules.
#[derive(Debug, Clone)]
pub struct RuleSource {
    pub name: String,
    pub content: String,
}

impl RuleSource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("builtin/languages.yaml", include_str!("builtin/languages.yaml")),
    ("builtin/tooling.yaml", include_str!("builtin/tooling.yaml")),
    ("builtin/services.yaml", include_str!("builtin/services.yaml")),
];

/// Immutable rule set, built once per run.
#[derive(Debug, Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
    by_tech: HashMap<String, usize>,
    by_ecosystem: HashMap<String, Vec<usize>>,
    rejected: Vec<RuleError>,
}

impl RuleCatalog {
    pub fn builtin_sources() -> Vec<RuleSource> {
        BUILTIN_SOURCES
            .iter()
            .map(|(name, content)| RuleSource::new(*name, *content))
            .collect()
    }

    pub fn builtin() -> Result<Self, RuleLoadError> {
        Self::load(&Self::builtin_sources())
    }

    /// Load and validate every rule of every source.
    ///
    /// A source that is not a YAML list aborts the load. A single invalid rule
    /// is recorded in [`RuleCatalog::rejected`] and skipped.
    pub fn load(sources: &[RuleSource]) -> Result<Self, RuleLoadError> {
        let mut catalog = Self::default();

        for source in sources {
            let entries: Vec<serde_yaml::Value> =
                serde_yaml::from_str(&source.content).map_err(|e| RuleLoadError::Parse {
                    source_name: source.name.clone(),
                    reason: e.to_string(),
                })?;

            for (index, entry) in entries.into_iter().enumerate() {
                let tech_hint = entry
                    .get("tech")
                    .and_then(|t| t.as_str())
                    .map(str::to_string);

                let validated = serde_yaml::from_value::<RawRule>(entry)
                    .map_err(|e| e.to_string())
                    .and_then(|raw| raw.validate(&source.name));

                match validated {
                    Ok(rule) => {
                        if let Err(reason) = catalog.insert(rule) {
                            catalog.reject(&source.name, index, tech_hint, reason);
                        }
                    }
                    Err(reason) => catalog.reject(&source.name, index, tech_hint, reason),
                }
            }
        }

        debug!(
            rules = catalog.rules.len(),
            rejected = catalog.rejected.len(),
            "Rule catalog loaded"
        );

        Ok(catalog)
    }

    /// Load every `*.yml` / `*.yaml` file in `dir`, sorted by file name.
    pub fn sources_from_dir(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<RuleSource>, RuleLoadError> {
        let mut entries = fs.read_dir(dir).map_err(|e| RuleLoadError::Io {
            source_name: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut sources = Vec::new();
        for entry in entries.iter().filter(|e| e.is_file()) {
            if !matches!(entry.extension().as_deref(), Some("yml") | Some("yaml")) {
                continue;
            }
            let content = fs.read_to_string(entry.path()).map_err(|e| RuleLoadError::Io {
                source_name: entry.path().display().to_string(),
                reason: e.to_string(),
            })?;
            sources.push(RuleSource::new(entry.path().display().to_string(), content));
        }
        Ok(sources)
    }

    /// Load only the rule files found in `dir`.
    pub fn load_dir(fs: &dyn FileSystem, dir: &Path) -> Result<Self, RuleLoadError> {
        Self::load(&Self::sources_from_dir(fs, dir)?)
    }

    fn insert(&mut self, rule: Rule) -> Result<(), String> {
        if let Some(existing) = self.by_tech.get(&rule.tech) {
            return Err(format!(
                "duplicate tech id, already defined in {}",
                self.rules[*existing].source
            ));
        }

        let index = self.rules.len();
        let mut ecosystems: Vec<&str> = rule.dependencies.iter().map(|d| d.ecosystem.as_str()).collect();
        ecosystems.sort_unstable();
        ecosystems.dedup();
        for ecosystem in ecosystems {
            self.by_ecosystem
                .entry(ecosystem.to_string())
                .or_default()
                .push(index);
        }
        self.by_tech.insert(rule.tech.clone(), index);
        self.rules.push(rule);
        Ok(())
    }

    fn reject(&mut self, source: &str, index: usize, tech: Option<String>, reason: String) {
        let error = RuleError {
            source_name: source.to_string(),
            index,
            tech,
            reason,
        };
        warn!(error = %error, "Rejected rule");
        self.rejected.push(error);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, tech: &str) -> Option<&Rule> {
        self.by_tech.get(tech).map(|i| &self.rules[*i])
    }

    pub fn rejected(&self) -> &[RuleError] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn rules_for_ecosystem(&self, ecosystem: &str) -> impl Iterator<Item = &Rule> {
        self.by_ecosystem
            .get(ecosystem)
            .into_iter()
            .flatten()
            .map(move |i| &self.rules[*i])
    }
}
