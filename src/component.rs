//! Frozen component tree, the output of a scan.

use crate::aggregate::{aggregate, AggregateSummary};
use crate::payload::{Dependency, License, RepositoryInfo};
use crate::rules::TechMatches;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dependency edge from a component to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    /// Id of the target child
    pub target: String,
    pub tech: String,
}

/// Immutable component node with its assigned id.
///
/// Only the identity assigner builds these, so every node in an output tree
/// carries a final, reproducible id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    id: String,
    name: String,
    paths: Vec<String>,
    #[serde(default)]
    primary_techs: Vec<String>,
    #[serde(default)]
    techs: TechMatches,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    languages: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    licenses: Vec<License>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repository: Option<RepositoryInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    implicit: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Component>,
}

/// Field set handed over by the identity assigner.
pub(crate) struct ComponentParts {
    pub id: String,
    pub name: String,
    pub paths: Vec<String>,
    pub primary_techs: Vec<String>,
    pub techs: TechMatches,
    pub dependencies: Vec<Dependency>,
    pub languages: BTreeMap<String, usize>,
    pub licenses: Vec<License>,
    pub repository: Option<RepositoryInfo>,
    pub properties: BTreeMap<String, String>,
    pub implicit: Option<String>,
    pub edges: Vec<Edge>,
    pub children: Vec<Component>,
}

impl Component {
    pub(crate) fn from_parts(parts: ComponentParts) -> Self {
        Self {
            id: parts.id,
            name: parts.name,
            paths: parts.paths,
            primary_techs: parts.primary_techs,
            techs: parts.techs,
            dependencies: parts.dependencies,
            languages: parts.languages,
            licenses: parts.licenses,
            repository: parts.repository,
            properties: parts.properties,
            implicit: parts.implicit,
            edges: parts.edges,
            children: parts.children,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn primary_techs(&self) -> &[String] {
        &self.primary_techs
    }

    pub fn techs(&self) -> &TechMatches {
        &self.techs
    }

    pub fn has_tech(&self, tech: &str) -> bool {
        self.techs.contains_key(tech)
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn languages(&self) -> &BTreeMap<String, usize> {
        &self.languages
    }

    pub fn licenses(&self) -> &[License] {
        &self.licenses
    }

    pub fn repository(&self) -> Option<&RepositoryInfo> {
        self.repository.as_ref()
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Tech this node was synthesized for, if it is an implicit child.
    pub fn implicit(&self) -> Option<&str> {
        self.implicit.as_deref()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn children(&self) -> &[Component] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Component> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Pre-order walk over this node and all descendants.
    pub fn iter(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Component> {
        self.iter().find(|c| c.id == id)
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Component>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Component;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Full,
    Aggregated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCounters {
    pub directories_visited: usize,
    pub directories_skipped: usize,
    pub files_skipped: usize,
}

/// Root-only description of how the tree was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub format: OutputFormat,
    pub version: String,
    pub root: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subfolders: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(flatten)]
    pub counters: ScanCounters,
    /// Set when the scan stopped early on request
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

/// Full-mode result: the frozen tree plus root metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub metadata: ScanMetadata,
    pub tree: Component,
}

impl ScanReport {
    /// Deduplicated summary. The tree itself is left untouched.
    pub fn aggregate(&self) -> AggregateSummary {
        aggregate(&self.tree, &self.metadata)
    }

    pub fn component_count(&self) -> usize {
        self.tree.iter().count()
    }
}
