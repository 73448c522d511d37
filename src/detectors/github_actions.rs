//! GitHub Actions workflows under `.github/workflows`.

use super::{ComponentDetector, DetectionContext};
use crate::payload::{Dependency, Fragment, Payload};
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::path::Path;

pub struct GitHubActionsDetector;

fn is_workflows_dir(dir: &Path) -> bool {
    dir.ends_with(".github/workflows")
}

fn is_workflow_file(name: &str) -> bool {
    name.ends_with(".yml") || name.ends_with(".yaml")
}

/// `uses:` references of every step and reusable-workflow job.
fn workflow_actions(document: &Value) -> Vec<&str> {
    let mut actions = Vec::new();
    let Some(jobs) = document.get("jobs").and_then(|j| j.as_mapping()) else {
        return actions;
    };
    for job in jobs.values() {
        if let Some(uses) = job.get("uses").and_then(|u| u.as_str()) {
            actions.push(uses);
        }
        let Some(steps) = job.get("steps").and_then(|s| s.as_sequence()) else {
            continue;
        };
        actions.extend(steps.iter().filter_map(|s| s.get("uses").and_then(|u| u.as_str())));
    }
    actions
}

fn action_dependency(uses: &str) -> Option<Dependency> {
    // Local actions (./path) and container actions (docker://) are not packages.
    if uses.starts_with("./") || uses.starts_with("docker://") {
        return None;
    }
    let (name, version) = match uses.split_once('@') {
        Some((name, version)) => (name, Some(version.to_string())),
        None => (uses, None),
    };
    Some(Dependency::new("githubAction", name, version))
}

impl ComponentDetector for GitHubActionsDetector {
    fn name(&self) -> &'static str {
        "github-actions"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Fragment>> {
        if !is_workflows_dir(ctx.dir) {
            return Ok(Vec::new());
        }
        let workflows: Vec<_> = ctx
            .listing
            .iter()
            .filter(|e| e.is_file() && is_workflow_file(e.file_name()))
            .collect();
        if workflows.is_empty() {
            return Ok(Vec::new());
        }

        let mut payload = Payload::fragment(String::new());
        let mut dependencies = Vec::new();
        for entry in workflows {
            let path = ctx.relative(entry.file_name());
            let content = ctx.read(entry)?;
            let document: Value = serde_yaml::from_str(&content).with_context(|| format!("Invalid {}", path))?;

            payload.add_path(path);
            ctx.matcher
                .add_tech(&mut payload, "github-actions", format!("matched file: {}", entry.file_name()));
            for dependency in workflow_actions(&document).into_iter().filter_map(action_dependency) {
                if !dependencies.contains(&dependency) {
                    dependencies.push(dependency);
                }
            }
        }
        ctx.matcher.apply_dependencies(&mut payload, dependencies);

        Ok(vec![Fragment::Virtual(payload)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::run;
    use crate::fs::MockFileSystem;

    const CI: &str = r#"
name: ci
on: [push]
jobs:
  test:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - uses: actions/setup-node@v4
        with:
          node-version: 20
      - run: npm test
      - uses: ./.github/actions/local
  release:
    uses: acme/workflows/.github/workflows/release.yml@main
"#;

    #[test]
    fn test_workflow_steps_become_dependencies() {
        let fs = MockFileSystem::new();
        fs.add_file(".github/workflows/ci.yml", CI);

        let fragments = run(&GitHubActionsDetector, &fs, ".github/workflows").unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].is_virtual());
        let payload = fragments[0].payload();
        assert!(payload.has_tech("github-actions"));
        assert!(payload.paths.contains(".github/workflows/ci.yml"));
        let names: Vec<&str> = payload.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["actions/checkout", "actions/setup-node", "acme/workflows/.github/workflows/release.yml"]
        );
        assert_eq!(payload.dependencies[0].version.as_deref(), Some("v4"));
        assert_eq!(payload.dependencies[0].ecosystem, "githubAction");
    }

    #[test]
    fn test_ignored_outside_workflows_dir() {
        let fs = MockFileSystem::new();
        fs.add_file("ci/ci.yml", CI);
        assert!(run(&GitHubActionsDetector, &fs, "ci").unwrap().is_empty());
    }
}
