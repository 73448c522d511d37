//! Catalog-backed dependency matching handed to detectors.

use crate::payload::{Dependency, Payload};
use crate::rules::{RuleCatalog, TechMatches};

/// Read-only view of the rule catalog's dependency and env indexes.
#[derive(Clone, Copy)]
pub struct DependencyMatcher<'a> {
    catalog: &'a RuleCatalog,
}

impl<'a> DependencyMatcher<'a> {
    pub fn new(catalog: &'a RuleCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a RuleCatalog {
        self.catalog
    }

    pub fn match_dependencies<S: AsRef<str>>(&self, names: &[S], ecosystem: &str) -> TechMatches {
        self.catalog.match_dependencies(names, ecosystem)
    }

    pub fn match_env<S: AsRef<str>>(&self, variables: &[S]) -> TechMatches {
        self.catalog.match_env(variables)
    }

    /// Promote `tech` on `node` when its rule asks to be primary.
    pub fn add_primary_tech_if_needed(&self, node: &mut Payload, tech: &str) {
        if self.catalog.get(tech).map(|r| r.is_primary).unwrap_or(false) {
            node.add_primary_tech(tech);
        }
    }

    /// Record the dependencies on `node` and add every tech they map to.
    pub fn apply_dependencies(&self, node: &mut Payload, dependencies: Vec<Dependency>) {
        let mut by_ecosystem: Vec<(String, Vec<String>)> = Vec::new();
        for dependency in &dependencies {
            match by_ecosystem.iter_mut().find(|(e, _)| *e == dependency.ecosystem) {
                Some((_, names)) => names.push(dependency.name.clone()),
                None => by_ecosystem.push((dependency.ecosystem.clone(), vec![dependency.name.clone()])),
            }
        }
        for dependency in dependencies {
            node.add_dependency(dependency);
        }
        for (ecosystem, names) in by_ecosystem {
            self.apply_techs(node, self.match_dependencies(&names, &ecosystem));
        }
    }

    /// Add matched techs to `node`, promoting the primary ones.
    pub fn apply_techs(&self, node: &mut Payload, matches: TechMatches) {
        let techs: Vec<String> = matches.keys().cloned().collect();
        node.add_techs(matches);
        for tech in techs {
            self.add_primary_tech_if_needed(node, &tech);
        }
    }

    /// Add a detector-asserted tech, promoting it if its rule is primary.
    pub fn add_tech(&self, node: &mut Payload, tech: &str, reason: impl Into<String>) {
        node.add_tech(tech, reason);
        self.add_primary_tech_if_needed(node, tech);
    }
}
