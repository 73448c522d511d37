//! Merge semantics: virtual fragments, named children and implicit children.

use super::{Fragment, Payload};
use crate::rules::{RuleCatalog, TechMatches};
use std::collections::BTreeSet;
use tracing::trace;

impl Payload {
    /// Fold a virtual fragment into this node.
    ///
    /// Paths, techs, reasons, dependencies, licenses and languages are
    /// unioned. Existing properties and repository identity are kept.
    /// Children carried by the fragment are adopted together with their edges.
    pub fn merge(&mut self, other: Payload) {
        if self.name.is_empty() {
            self.name = other.name;
        }
        self.paths.extend(other.paths);
        self.add_techs(other.techs);
        for tech in &other.primary_techs {
            self.add_primary_tech(tech);
        }
        for dependency in other.dependencies {
            self.add_dependency(dependency);
        }
        for (language, count) in other.languages {
            self.add_language(&language, count);
        }
        for license in other.licenses {
            self.add_license(license.license, license.source);
        }
        if self.repository.is_none() {
            self.repository = other.repository;
        }
        for (key, value) in other.properties {
            self.set_property(key, value);
        }

        let offset = self.children.len();
        self.children.extend(other.children);
        for edge in other.edges {
            self.add_edge(edge.child + offset, edge.tech);
        }
    }

    /// Attach one directory's detector output.
    ///
    /// Virtual fragments are merged first, then named fragments become
    /// children. Returns the child indexes of the named fragments, in input
    /// order.
    pub fn absorb(&mut self, fragments: Vec<Fragment>, catalog: &RuleCatalog) -> Vec<usize> {
        let before = self.tech_set();
        let (virtuals, named): (Vec<_>, Vec<_>) = fragments.into_iter().partition(Fragment::is_virtual);

        for fragment in virtuals {
            if let Fragment::Virtual(payload) = fragment {
                self.merge(payload);
            }
        }

        let mut attached = Vec::with_capacity(named.len());
        for fragment in named {
            if let Fragment::Named(mut child) = fragment {
                child.materialize_implicit(&BTreeSet::new(), catalog);
                attached.push(self.add_child(child));
            }
        }

        self.materialize_implicit(&before, catalog);
        attached
    }

    /// Apply direct rule matches, promote primary techs, then materialize
    /// implicit children for techs that were not present before.
    pub fn apply_matches(&mut self, matches: TechMatches, catalog: &RuleCatalog) {
        let before = self.tech_set();
        let techs: Vec<String> = matches.keys().cloned().collect();
        self.add_techs(matches);
        for tech in techs {
            if catalog.get(&tech).map(|r| r.is_primary).unwrap_or(false) {
                self.add_primary_tech(&tech);
            }
        }
        self.materialize_implicit(&before, catalog);
    }

    /// One implicit child per component-worthy tech added since `before`.
    ///
    /// A tech that already has an implicit child under this node does not get
    /// a second one, and an implicit node never spawns itself.
    pub(crate) fn materialize_implicit(&mut self, before: &BTreeSet<String>, catalog: &RuleCatalog) {
        let added: Vec<String> = self
            .techs
            .keys()
            .filter(|t| !before.contains(*t))
            .cloned()
            .collect();

        for tech in added {
            let Some(rule) = catalog.get(&tech) else {
                continue;
            };
            if !rule.creates_component
                || self.implicit.as_deref() == Some(tech.as_str())
                || self.implicit_child(&tech).is_some()
            {
                continue;
            }

            let mut child = Payload {
                name: rule.name.clone(),
                paths: self.paths.clone(),
                implicit: Some(tech.clone()),
                ..Default::default()
            };
            if let Some(reasons) = self.techs.get(&tech) {
                child.techs.insert(tech.clone(), reasons.clone());
            }
            if rule.is_primary {
                child.add_primary_tech(&tech);
            }

            trace!(parent = %self.name, tech = %tech, "Implicit child created");
            let index = self.add_child(child);
            if rule.creates_edge {
                self.add_edge(index, tech);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Dependency;
    use crate::rules::RuleSource;

    fn catalog() -> RuleCatalog {
        RuleCatalog::load(&[RuleSource::new(
            "test.yaml",
            r#"
- { tech: npm, name: npm, type: package_manager }
- { tech: rust, name: Rust, type: language, primary: true }
- tech: redis
  name: Redis
  type: db
  component: true
  edge: true
- tech: stripe
  name: Stripe
  type: saas
  component: true
"#,
        )])
        .unwrap()
    }

    fn fragment_with(tech: &str, reason: &str) -> Payload {
        let mut p = Payload::fragment("package.json");
        p.add_tech(tech, reason);
        p
    }

    #[test]
    fn test_virtual_fragment_merges_into_node() {
        let catalog = catalog();
        let mut node = Payload::new("root", ".");
        let mut fragment = fragment_with("npm", "matched file: package-lock.json");
        fragment.add_dependency(Dependency::new("npm", "left-pad", Some("1.0.0".into())));

        let attached = node.absorb(vec![Fragment::Virtual(fragment)], &catalog);

        assert!(attached.is_empty());
        assert!(node.children.is_empty());
        assert!(node.has_tech("npm"));
        assert!(node.paths.contains("package.json"));
        assert_eq!(node.dependencies.len(), 1);
        assert_eq!(node.name, "root");
    }

    #[test]
    fn test_named_fragment_becomes_child_with_implicit() {
        let catalog = catalog();
        let mut node = Payload::new("root", ".");
        let mut named = Payload::new("web", "web/package.json");
        named.add_tech("npm", "matched file: package-lock.json");
        named.add_tech("redis", "matched dependency: ioredis");

        let attached = node.absorb(vec![Fragment::Named(named)], &catalog);

        assert_eq!(attached, vec![0]);
        assert!(node.techs.is_empty());
        let web = &node.children[0];
        assert_eq!(web.children.len(), 1);
        assert_eq!(web.children[0].name, "Redis");
        assert_eq!(web.children[0].implicit.as_deref(), Some("redis"));
        assert_eq!(web.edges.len(), 1);
        assert_eq!(web.edges[0].tech, "redis");
    }

    #[test]
    fn test_one_implicit_child_per_tech() {
        let catalog = catalog();
        let mut node = Payload::new("root", ".");
        node.absorb(
            vec![
                Fragment::Virtual(fragment_with("stripe", "matched dependency: stripe")),
                Fragment::Virtual(fragment_with("stripe", "matched env: STRIPE_KEY")),
            ],
            &catalog,
        );
        let mut again = TechMatches::new();
        again.insert("stripe".into(), vec!["matched env: STRIPE_SECRET".into()]);
        node.apply_matches(again, &catalog);

        assert_eq!(node.children.len(), 1);
        assert_eq!(node.techs["stripe"].len(), 3);
        // no edge flag on stripe
        assert!(node.edges.is_empty());
    }

    #[test]
    fn test_apply_matches_promotes_primary() {
        let catalog = catalog();
        let mut node = Payload::new("root", ".");
        let mut matches = TechMatches::new();
        matches.insert("rust".into(), vec!["matched extension: .rs".into()]);
        matches.insert("npm".into(), vec!["matched file: .npmrc".into()]);
        node.apply_matches(matches.clone(), &catalog);
        node.apply_matches(matches, &catalog);

        assert_eq!(node.primary_techs, vec!["rust"]);
        assert_eq!(node.techs["rust"].len(), 1);
    }

    #[test]
    fn test_merge_adopts_children_and_reindexes_edges() {
        let catalog = catalog();
        let mut node = Payload::new("root", ".");
        node.add_child(Payload::new("existing", "a"));

        let mut fragment = Payload::fragment("docker-compose.yml");
        fragment.add_tech("redis", "matched dependency: redis:7");
        fragment.materialize_implicit(&BTreeSet::new(), &catalog);
        assert_eq!(fragment.edges[0].child, 0);

        node.merge(fragment);
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.edges[0].child, 1);
    }

    #[test]
    fn test_implicit_node_does_not_spawn_itself() {
        let catalog = catalog();
        let mut node = Payload::new("Redis", ".");
        node.implicit = Some("redis".into());
        node.add_tech("redis", "matched file: redis.conf");
        node.materialize_implicit(&BTreeSet::new(), &catalog);
        assert!(node.children.is_empty());
    }
}
