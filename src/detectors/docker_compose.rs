//! Compose files: one component per service.

use super::{ComponentDetector, DetectionContext};
use crate::payload::{Dependency, Fragment, Payload};
use anyhow::{Context, Result};
use serde_yaml::Value;

const COMPOSE_FILES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

pub struct DockerComposeDetector;

/// Split `registry:5000/org/app:1.2` into name and tag. The tag separator is
/// the last `:` after the last `/`; digests (`@sha256:..`) are dropped.
pub(crate) fn split_image(image: &str) -> (String, Option<String>) {
    let image = image.split('@').next().unwrap_or(image);
    let slash = image.rfind('/').map(|i| i + 1).unwrap_or(0);
    match image[slash..].rfind(':') {
        Some(colon) => {
            let at = slash + colon;
            (image[..at].to_string(), Some(image[at + 1..].to_string()))
        }
        None => (image.to_string(), None),
    }
}

/// Variable names from either the list (`- KEY=value`) or map form.
fn environment_names(environment: &Value) -> Vec<String> {
    match environment {
        Value::Sequence(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter_map(|item| item.split('=').next())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect(),
        Value::Mapping(map) => map
            .keys()
            .filter_map(|k| k.as_str())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

impl ComponentDetector for DockerComposeDetector {
    fn name(&self) -> &'static str {
        "docker-compose"
    }

    /// Services describe sibling processes, not the directory they are declared in.
    fn claims_directory(&self) -> bool {
        false
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Fragment>> {
        let Some(entry) = ctx.first_file(COMPOSE_FILES) else {
            return Ok(Vec::new());
        };
        let path = ctx.relative(entry.file_name());
        let content = ctx.read(entry)?;
        let document: Value = serde_yaml::from_str(&content).with_context(|| format!("Invalid {}", path))?;

        let mut fragments = Vec::new();
        let mut compose = Payload::fragment(path.clone());
        ctx.matcher
            .add_tech(&mut compose, "docker-compose", format!("matched file: {}", entry.file_name()));
        fragments.push(Fragment::Virtual(compose));

        let Some(services) = document.get("services").and_then(|s| s.as_mapping()) else {
            return Ok(fragments);
        };
        for (service_name, service) in services {
            let Some(service_name) = service_name.as_str() else {
                continue;
            };
            let mut payload = Payload::new(service_name, path.clone());

            if let Some(image) = service.get("image").and_then(|i| i.as_str()) {
                let (name, tag) = split_image(image);
                payload.set_property("image", image);
                ctx.matcher
                    .apply_dependencies(&mut payload, vec![Dependency::new("docker", name, tag)]);
            }
            if service.get("build").is_some() {
                payload.set_property("build", "true");
            }
            if let Some(environment) = service.get("environment") {
                let names = environment_names(environment);
                let matches = ctx.matcher.match_env(&names);
                ctx.matcher.apply_techs(&mut payload, matches);
            }
            fragments.push(Fragment::Named(payload));
        }
        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::run;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_split_image() {
        assert_eq!(split_image("redis:7"), ("redis".to_string(), Some("7".to_string())));
        assert_eq!(split_image("postgres"), ("postgres".to_string(), None));
        assert_eq!(
            split_image("registry:5000/org/app:1.2"),
            ("registry:5000/org/app".to_string(), Some("1.2".to_string()))
        );
        assert_eq!(split_image("nginx@sha256:abc"), ("nginx".to_string(), None));
    }

    #[test]
    fn test_services_become_named_fragments() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "docker-compose.yml",
            r#"
services:
  api:
    build: .
    environment:
      - REDIS_URL=redis://cache:6379
      - PORT=8080
  db:
    image: postgres:16
    environment:
      POSTGRES_PASSWORD: secret
  cache:
    image: redis:7
"#,
        );

        let fragments = run(&DockerComposeDetector, &fs, "").unwrap();
        assert_eq!(fragments.len(), 4);
        assert!(fragments[0].is_virtual());
        assert!(fragments[0].payload().has_tech("docker-compose"));

        let api = fragments[1].payload();
        assert_eq!(api.name, "api");
        assert_eq!(api.techs["redis"], vec!["matched env: REDIS_URL".to_string()]);
        assert!(api.dependencies.is_empty());

        let db = fragments[2].payload();
        assert_eq!(db.dependencies[0].name, "postgres");
        assert_eq!(db.dependencies[0].version.as_deref(), Some("16"));
        assert_eq!(db.techs["postgresql"].len(), 2);
        assert!(fragments[3].payload().has_tech("redis"));
    }

    #[test]
    fn test_compose_without_services() {
        let fs = MockFileSystem::new();
        fs.add_file("compose.yaml", "version: '3'\n");
        let fragments = run(&DockerComposeDetector, &fs, "").unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].is_virtual());
    }
}
