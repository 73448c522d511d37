//! Mutable component builder used during traversal.
//!
//! A [`Payload`] is owned exclusively by the traversal engine while the scan
//! runs. Once the walk finishes it is frozen into an immutable
//! [`Component`](crate::component::Component) by the identity assigner; no
//! builder ever escapes into output.

mod merge;
mod types;

pub use types::{Dependency, License, RepositoryInfo};

use crate::rules::{add_reason, TechMatches};
use std::collections::{BTreeMap, BTreeSet};

/// Detector output tagged by how it joins the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Merged into the requesting node; never becomes a child.
    Virtual(Payload),
    /// Attached as a new, independent child.
    Named(Payload),
}

impl Fragment {
    pub fn payload(&self) -> &Payload {
        match self {
            Fragment::Virtual(p) | Fragment::Named(p) => p,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Fragment::Virtual(_))
    }
}

/// Parent-to-child dependency edge, by child index while building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEdge {
    pub child: usize,
    pub tech: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub name: String,
    pub paths: BTreeSet<String>,
    pub primary_techs: Vec<String>,
    pub techs: TechMatches,
    pub dependencies: Vec<Dependency>,
    pub languages: BTreeMap<String, usize>,
    pub licenses: Vec<License>,
    pub repository: Option<RepositoryInfo>,
    pub properties: BTreeMap<String, String>,
    pub children: Vec<Payload>,
    pub edges: Vec<ChildEdge>,
    /// Tech this node was synthesized for, when it is an implicit child
    pub implicit: Option<String>,
}

impl Payload {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let mut payload = Self {
            name: name.into(),
            ..Default::default()
        };
        payload.add_path(path);
        payload
    }

    /// A nameless fragment body, for virtual detector output.
    pub fn fragment(path: impl Into<String>) -> Self {
        Self::new(String::new(), path)
    }

    pub fn add_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !path.is_empty() {
            self.paths.insert(path);
        }
    }

    pub fn has_tech(&self, tech: &str) -> bool {
        self.techs.contains_key(tech)
    }

    pub fn tech_set(&self) -> BTreeSet<String> {
        self.techs.keys().cloned().collect()
    }

    /// Record a tech with one reason. Empty reasons are refused so every
    /// present tech keeps at least one.
    pub fn add_tech(&mut self, tech: &str, reason: impl Into<String>) {
        let reason = reason.into();
        if reason.is_empty() {
            return;
        }
        add_reason(&mut self.techs, tech, reason);
    }

    pub fn add_techs(&mut self, matches: TechMatches) {
        for (tech, reasons) in matches {
            for reason in reasons {
                self.add_tech(&tech, reason);
            }
        }
    }

    /// Promote a present tech to the headline list.
    pub fn add_primary_tech(&mut self, tech: &str) {
        if self.has_tech(tech) && !self.primary_techs.iter().any(|t| t == tech) {
            self.primary_techs.push(tech.to_string());
        }
    }

    pub fn add_dependency(&mut self, dependency: Dependency) {
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
    }

    pub fn add_language(&mut self, language: &str, count: usize) {
        if count > 0 {
            *self.languages.entry(language.to_string()).or_insert(0) += count;
        }
    }

    pub fn add_license(&mut self, license: impl Into<String>, source: impl Into<String>) {
        let license = License {
            license: license.into(),
            source: source.into(),
        };
        if !self.licenses.contains(&license) {
            self.licenses.push(license);
        }
    }

    /// First writer wins.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Attach a child and return its index.
    pub fn add_child(&mut self, child: Payload) -> usize {
        self.children.push(child);
        self.children.len() - 1
    }

    pub fn add_edge(&mut self, child: usize, tech: impl Into<String>) {
        let edge = ChildEdge {
            child,
            tech: tech.into(),
        };
        if child < self.children.len() && !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    pub fn implicit_child(&self, tech: &str) -> Option<&Payload> {
        self.children
            .iter()
            .find(|c| c.implicit.as_deref() == Some(tech))
    }

    /// Number of nodes in this subtree, self included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Payload::node_count).sum::<usize>()
    }
}
