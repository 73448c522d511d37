//! Flat, deduplicated projection of a frozen component tree.

use crate::component::{Component, OutputFormat, ScanMetadata};
use crate::payload::{Dependency, License, RepositoryInfo};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub metadata: ScanMetadata,
    /// Number of nodes folded
    pub components: usize,
    pub repositories: Vec<RepositoryInfo>,
    pub primary_techs: Vec<String>,
    pub techs: BTreeMap<String, Vec<String>>,
    pub languages: BTreeMap<String, usize>,
    pub licenses: Vec<License>,
    pub dependencies: Vec<Dependency>,
}

#[derive(Default)]
struct Fold {
    components: usize,
    repositories: BTreeSet<RepositoryInfo>,
    primary_techs: BTreeSet<String>,
    techs: BTreeMap<String, BTreeSet<String>>,
    languages: BTreeMap<String, usize>,
    licenses: BTreeSet<License>,
    dependencies: BTreeSet<Dependency>,
}

impl Fold {
    fn visit(&mut self, node: &Component) {
        self.components += 1;
        if let Some(repository) = node.repository() {
            self.repositories.insert(repository.clone());
        }
        self.primary_techs.extend(node.primary_techs().iter().cloned());
        for (tech, reasons) in node.techs() {
            self.techs
                .entry(tech.clone())
                .or_default()
                .extend(reasons.iter().cloned());
        }
        for (language, count) in node.languages() {
            *self.languages.entry(language.clone()).or_insert(0) += count;
        }
        self.licenses.extend(node.licenses().iter().cloned());
        self.dependencies.extend(node.dependencies().iter().cloned());
    }
}

/// Fold every node of `tree` into one summary.
///
/// Reads only. The metadata is cloned and relabeled `aggregated`; output
/// collections are sorted, so the result is the same for any child order.
pub fn aggregate(tree: &Component, metadata: &ScanMetadata) -> AggregateSummary {
    let mut fold = Fold::default();
    for node in tree.iter() {
        fold.visit(node);
    }

    let mut metadata = metadata.clone();
    metadata.format = OutputFormat::Aggregated;

    AggregateSummary {
        metadata,
        components: fold.components,
        repositories: fold.repositories.into_iter().collect(),
        primary_techs: fold.primary_techs.into_iter().collect(),
        techs: fold
            .techs
            .into_iter()
            .map(|(tech, reasons)| (tech, reasons.into_iter().collect()))
            .collect(),
        languages: fold.languages,
        licenses: fold.licenses.into_iter().collect(),
        dependencies: fold.dependencies.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ScanCounters;
    use crate::identity::IdentityAssigner;
    use crate::payload::Payload;
    use chrono::Utc;

    fn metadata() -> ScanMetadata {
        ScanMetadata {
            format: OutputFormat::Full,
            version: "test".to_string(),
            root: "/repo".to_string(),
            subfolders: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
            counters: ScanCounters::default(),
            cancelled: false,
        }
    }

    fn service(name: &str, reason: &str, dep_version: &str) -> Payload {
        let mut p = Payload::new(name, name);
        p.add_tech("npm", reason);
        p.add_language("TypeScript", 2);
        p.add_dependency(Dependency::new("npm", "react", Some(dep_version.to_string())));
        p
    }

    #[test]
    fn test_reasons_unioned_not_overwritten() {
        let mut root = Payload::new("root", ".");
        root.add_child(service("a", "matched file: package-lock.json", "18.2.0"));
        root.add_child(service("b", "matched file: .npmrc", "18.2.0"));
        let tree = IdentityAssigner::new("r").freeze(root);

        let summary = aggregate(&tree, &metadata());
        assert_eq!(
            summary.techs["npm"],
            vec![
                "matched file: .npmrc".to_string(),
                "matched file: package-lock.json".to_string()
            ]
        );
        assert_eq!(summary.languages["TypeScript"], 4);
        assert_eq!(summary.dependencies.len(), 1);
        assert_eq!(summary.components, 3);
        assert_eq!(summary.metadata.format, OutputFormat::Aggregated);
    }

    #[test]
    fn test_dependencies_keep_distinct_versions() {
        let mut root = Payload::new("root", ".");
        root.add_child(service("a", "r", "18.2.0"));
        root.add_child(service("b", "r", "17.0.0"));
        let summary = aggregate(&IdentityAssigner::new("r").freeze(root), &metadata());
        assert_eq!(summary.dependencies.len(), 2);
        assert_eq!(summary.dependencies[0].version.as_deref(), Some("17.0.0"));
    }

    #[test]
    fn test_child_order_and_repetition_do_not_matter() {
        let build = |names: &[&str]| {
            let mut root = Payload::new("root", ".");
            for name in names {
                let mut child = service(name, &format!("matched file: {}", name), "1");
                child.repository = Some(RepositoryInfo {
                    remote_url: Some(format!("https://example.com/{}", name)),
                    branch: Some("main".into()),
                    commit: None,
                });
                root.add_child(child);
            }
            IdentityAssigner::new("r").freeze(root)
        };

        let meta = metadata();
        let forward = aggregate(&build(&["a", "b", "c"]), &meta);
        let backward = aggregate(&build(&["c", "b", "a"]), &meta);
        assert_eq!(forward, backward);
        assert_eq!(forward, aggregate(&build(&["a", "b", "c"]), &meta));
        assert_eq!(forward.repositories.len(), 3);
        assert_eq!(meta.format, OutputFormat::Full);
    }
}
