//! Go modules (`go.mod`).

use super::{ComponentDetector, DetectionContext};
use crate::payload::{Dependency, Fragment, Payload};
use anyhow::{anyhow, Result};
use regex::Regex;
use std::collections::HashSet;

const MANIFEST: &str = "go.mod";

pub struct GoModDetector;

impl GoModDetector {
    fn module_path(content: &str) -> Option<&str> {
        content.lines().find_map(|line| {
            line.trim()
                .strip_prefix("module ")
                .map(|m| m.trim().trim_matches('"'))
                .filter(|m| !m.is_empty())
        })
    }

    fn go_version(content: &str) -> Option<String> {
        Regex::new(r"(?m)^go\s+(\d+\.\d+(?:\.\d+)?)")
            .ok()
            .and_then(|re| re.captures(content))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// `require` directives, both the block and the single-line form.
    fn requirements(content: &str) -> Result<Vec<Dependency>> {
        let require_re = Regex::new(r"^([^\s]+)\s+(v[^\s]+)")?;
        let mut dependencies = Vec::new();
        let mut seen = HashSet::new();
        let mut in_require = false;

        for line in content.lines() {
            let trimmed = line.split("//").next().unwrap_or("").trim();

            let directive = if trimmed.starts_with("require (") || trimmed == "require(" {
                in_require = true;
                continue;
            } else if trimmed == ")" {
                in_require = false;
                continue;
            } else if in_require {
                trimmed
            } else if let Some(rest) = trimmed.strip_prefix("require ") {
                rest.trim()
            } else {
                continue;
            };

            let Some(caps) = require_re.captures(directive) else {
                continue;
            };
            let (Some(name), Some(version)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if seen.insert(name.as_str().to_string()) {
                dependencies.push(Dependency::new(
                    "golang",
                    name.as_str(),
                    Some(version.as_str().to_string()),
                ));
            }
        }
        Ok(dependencies)
    }
}

impl ComponentDetector for GoModDetector {
    fn name(&self) -> &'static str {
        "golang"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Fragment>> {
        let Some(entry) = ctx.file(MANIFEST) else {
            return Ok(Vec::new());
        };
        let content = ctx.read(entry)?;
        let module = Self::module_path(&content)
            .ok_or_else(|| anyhow!("No module directive in {}", ctx.relative(MANIFEST)))?;

        let mut payload = Payload::new(module, ctx.relative(MANIFEST));
        let reason = format!("matched file: {}", MANIFEST);
        ctx.matcher.add_tech(&mut payload, "gomod", reason.clone());
        ctx.matcher.add_tech(&mut payload, "golang", reason);
        ctx.matcher
            .apply_dependencies(&mut payload, Self::requirements(&content)?);

        if let Some(version) = Self::go_version(&content) {
            payload.set_property("go", version);
        }

        Ok(vec![Fragment::Named(payload)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::run;
    use crate::fs::MockFileSystem;

    const GO_MOD: &str = r#"module github.com/acme/billing

go 1.22.1

require github.com/lib/pq v1.10.9

require (
	github.com/gin-gonic/gin v1.9.1
	github.com/go-redis/redis/v8 v8.11.5 // indirect
)
"#;

    #[test]
    fn test_module_with_requires() {
        let fs = MockFileSystem::new();
        fs.add_file("billing/go.mod", GO_MOD);

        let fragments = run(&GoModDetector, &fs, "billing").unwrap();
        let Fragment::Named(payload) = &fragments[0] else {
            panic!("expected named fragment");
        };
        assert_eq!(payload.name, "github.com/acme/billing");
        assert_eq!(payload.dependencies.len(), 3);
        assert_eq!(payload.dependencies[0].version.as_deref(), Some("v1.10.9"));
        assert!(payload.has_tech("postgresql"));
        assert!(payload.has_tech("gin"));
        assert!(payload.has_tech("redis"));
        assert_eq!(payload.primary_techs, vec!["golang"]);
        assert_eq!(payload.properties["go"], "1.22.1");
    }

    #[test]
    fn test_missing_module_directive_fails() {
        let fs = MockFileSystem::new();
        fs.add_file("go.mod", "go 1.21\n");
        assert!(run(&GoModDetector, &fs, "").is_err());
    }
}
