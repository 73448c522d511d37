//! Python projects: `pyproject.toml` (PEP 621 or Poetry) and `requirements.txt`.

use super::parsers::{parse_pep508, toml_path, DependencyParser, RegexDependencyParser, TomlDependencyParser};
use super::{ComponentDetector, DetectionContext};
use crate::payload::{Dependency, Fragment, Payload};
use anyhow::{Context, Result};
use regex::Regex;

const PYPROJECT: &str = "pyproject.toml";
const REQUIREMENTS: &str = "requirements.txt";
const POETRY_LOCK: &str = "poetry.lock";
const ECOSYSTEM: &str = "python";

pub struct PythonDetector;

impl PythonDetector {
    fn pep621_dependencies(manifest: &toml::Value) -> Vec<Dependency> {
        let mut requirements: Vec<&str> = toml_path(manifest, "project.dependencies")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        if let Some(groups) = toml_path(manifest, "project.optional-dependencies").and_then(|v| v.as_table()) {
            for items in groups.values().filter_map(|v| v.as_array()) {
                requirements.extend(items.iter().filter_map(|v| v.as_str()));
            }
        }

        let mut dependencies: Vec<Dependency> = Vec::new();
        for requirement in requirements {
            let Some((name, version)) = parse_pep508(requirement) else {
                continue;
            };
            if dependencies.iter().all(|d| d.name != name) {
                dependencies.push(Dependency::new(ECOSYSTEM, name, version));
            }
        }
        dependencies
    }

    fn requirements(ctx: &DetectionContext<'_>) -> Result<Option<Vec<Dependency>>> {
        let Some(entry) = ctx.file(REQUIREMENTS) else {
            return Ok(None);
        };
        let content = ctx.read(entry)?;
        let parser = RegexDependencyParser {
            ecosystem: ECOSYSTEM,
            line_pattern: Regex::new(r"^([A-Za-z0-9][A-Za-z0-9_.\-]*)\s*(?:\[[^\]]*\])?\s*([<>=!~][^;#]*)?")?,
        };
        let dependencies = parser
            .parse(&content)?
            .into_iter()
            .map(|d| Dependency::new(ECOSYSTEM, d.name.to_ascii_lowercase(), d.version))
            .collect();
        Ok(Some(dependencies))
    }
}

impl ComponentDetector for PythonDetector {
    fn name(&self) -> &'static str {
        "python"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Fragment>> {
        let requirements = Self::requirements(ctx)?;
        let pyproject = match ctx.file(PYPROJECT) {
            Some(entry) => {
                let content = ctx.read(entry)?;
                let manifest: toml::Value =
                    toml::from_str(&content).with_context(|| format!("Invalid {}", ctx.relative(PYPROJECT)))?;
                Some(manifest)
            }
            None => None,
        };
        if pyproject.is_none() && requirements.is_none() {
            return Ok(Vec::new());
        }

        let name = pyproject.as_ref().and_then(|m| {
            toml_path(m, "project.name")
                .or_else(|| toml_path(m, "tool.poetry.name"))
                .and_then(|v| v.as_str())
                .filter(|n| !n.is_empty())
                .map(String::from)
        });
        let uses_poetry = ctx.has_file(POETRY_LOCK)
            || pyproject
                .as_ref()
                .map(|m| toml_path(m, "tool.poetry").is_some())
                .unwrap_or(false);

        let mut payload = Payload::new(name.clone().unwrap_or_default(), "");
        if pyproject.is_some() {
            payload.add_path(ctx.relative(PYPROJECT));
        }
        if requirements.is_some() {
            payload.add_path(ctx.relative(REQUIREMENTS));
        }

        let manifest_file = if pyproject.is_some() { PYPROJECT } else { REQUIREMENTS };
        ctx.matcher
            .add_tech(&mut payload, "python", format!("matched file: {}", manifest_file));
        if uses_poetry {
            let evidence = if ctx.has_file(POETRY_LOCK) { POETRY_LOCK } else { PYPROJECT };
            ctx.matcher
                .add_tech(&mut payload, "poetry", format!("matched file: {}", evidence));
        } else {
            ctx.matcher
                .add_tech(&mut payload, "pip", format!("matched file: {}", manifest_file));
        }

        let mut dependencies = Vec::new();
        if let Some(manifest) = &pyproject {
            dependencies.extend(Self::pep621_dependencies(manifest));
            let poetry = TomlDependencyParser {
                ecosystem: ECOSYSTEM,
                dependencies_keys: &[
                    "tool.poetry.dependencies",
                    "tool.poetry.dev-dependencies",
                    "tool.poetry.group.dev.dependencies",
                ],
                skip: &["python"],
            };
            dependencies.extend(poetry.parse_value(manifest));

            if let Some(license) = toml_path(manifest, "project.license")
                .and_then(|v| v.as_str().or_else(|| v.get("text").and_then(|t| t.as_str())))
                .or_else(|| toml_path(manifest, "tool.poetry.license").and_then(|v| v.as_str()))
            {
                payload.add_license(license, ctx.relative(PYPROJECT));
            }
            if let Some(version) = toml_path(manifest, "project.version")
                .or_else(|| toml_path(manifest, "tool.poetry.version"))
                .and_then(|v| v.as_str())
            {
                payload.set_property("version", version);
            }
            if let Some(python) = toml_path(manifest, "project.requires-python").and_then(|v| v.as_str()) {
                payload.set_property("requires-python", python);
            }
        }
        dependencies.extend(requirements.unwrap_or_default());
        ctx.matcher.apply_dependencies(&mut payload, dependencies);

        Ok(vec![match name {
            Some(_) => Fragment::Named(payload),
            None => Fragment::Virtual(payload),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::run;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_pep621_project() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "svc/pyproject.toml",
            r#"
[project]
name = "svc"
version = "2.0.0"
license = "MIT"
requires-python = ">=3.11"
dependencies = ["Django>=5.0", "psycopg2-binary; sys_platform != 'win32'"]

[project.optional-dependencies]
test = ["pytest>=8"]
"#,
        );

        let fragments = run(&PythonDetector, &fs, "svc").unwrap();
        let Fragment::Named(payload) = &fragments[0] else {
            panic!("expected named fragment");
        };
        assert_eq!(payload.name, "svc");
        assert!(payload.has_tech("pip"));
        assert!(payload.has_tech("django"));
        assert!(payload.has_tech("postgresql"));
        assert!(payload.has_tech("pytest"));
        assert_eq!(payload.primary_techs, vec!["python"]);
        assert_eq!(payload.dependencies[0].name, "django");
        assert_eq!(payload.properties["requires-python"], ">=3.11");
    }

    #[test]
    fn test_poetry_project_with_requirements_folded_in() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "pyproject.toml",
            r#"
[tool.poetry]
name = "worker"

[tool.poetry.dependencies]
python = "^3.12"
redis = "^5.0"
"#,
        );
        fs.add_file("requirements.txt", "fastapi==0.110.0\n");

        let fragments = run(&PythonDetector, &fs, "").unwrap();
        assert_eq!(fragments.len(), 1);
        let payload = fragments[0].payload();
        assert!(payload.has_tech("poetry"));
        assert!(!payload.has_tech("pip"));
        assert!(payload.has_tech("redis"));
        assert!(payload.has_tech("fastapi"));
        assert!(payload.dependencies.iter().all(|d| d.name != "python"));
        assert_eq!(payload.paths.len(), 2);
    }

    #[test]
    fn test_requirements_only_is_virtual() {
        let fs = MockFileSystem::new();
        fs.add_file("requirements.txt", "# pinned\nFlask==3.0.0\nrequests>=2.31 ; python_version > '3.8'\n-e .\n");

        let fragments = run(&PythonDetector, &fs, "").unwrap();
        assert!(fragments[0].is_virtual());
        let payload = fragments[0].payload();
        assert_eq!(payload.dependencies.len(), 2);
        assert_eq!(payload.dependencies[0].name, "flask");
        assert_eq!(payload.dependencies[1].version.as_deref(), Some(">=2.31"));
        assert!(payload.has_tech("flask"));
    }
}
