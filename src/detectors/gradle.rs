//! Gradle builds (`build.gradle(.kts)` with an optional settings companion).

use super::parsers::{DependencyParser, RegexDependencyParser};
use super::{ComponentDetector, DetectionContext};
use crate::payload::{Fragment, Payload};
use anyhow::Result;
use regex::Regex;

const BUILD_FILES: &[&str] = &["build.gradle.kts", "build.gradle"];
const SETTINGS_FILES: &[&str] = &["settings.gradle.kts", "settings.gradle"];

const CONFIGURATIONS: &str = "implementation|api|compileOnly|runtimeOnly|testImplementation|testRuntimeOnly|\
                              testCompileOnly|annotationProcessor|kapt|ksp|compile|testCompile|classpath";

pub struct GradleDetector;

impl GradleDetector {
    fn root_project_name(settings: &str) -> Option<String> {
        Regex::new(r#"rootProject\.name\s*=\s*["']([^"']+)["']"#)
            .ok()?
            .captures(settings)?
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .filter(|n| !n.is_empty())
    }

    /// Subprojects listed by `include(...)` or `include '...'`.
    fn included_projects(settings: &str) -> Vec<String> {
        let mut projects = Vec::new();
        for line in settings.lines() {
            let Some(rest) = line.trim().strip_prefix("include") else {
                continue;
            };
            if !rest.starts_with([' ', '(']) {
                continue;
            }
            let rest = rest.trim().trim_start_matches('(').trim_end_matches(')');
            for project in rest.split(',') {
                let project = project.trim().trim_matches(|c| c == '\'' || c == '"');
                if !project.is_empty() {
                    projects.push(project.trim_start_matches(':').to_string());
                }
            }
        }
        projects
    }

    fn dependency_parser() -> Result<RegexDependencyParser> {
        let pattern = format!(
            r#"^(?:{})\s*\(?\s*["']([^:"'\s]+:[^:"'\s]+)(?::([^"'\s@]+))?[^"']*["']"#,
            CONFIGURATIONS
        );
        Ok(RegexDependencyParser {
            ecosystem: "maven",
            line_pattern: Regex::new(&pattern)?,
        })
    }
}

impl ComponentDetector for GradleDetector {
    fn name(&self) -> &'static str {
        "gradle"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Fragment>> {
        let build = ctx.first_file(BUILD_FILES);
        let settings = ctx.first_file(SETTINGS_FILES);
        if build.is_none() && settings.is_none() {
            return Ok(Vec::new());
        }

        let settings_content = match settings {
            Some(entry) => Some(ctx.read(entry)?),
            None => None,
        };
        let name = settings_content
            .as_deref()
            .and_then(Self::root_project_name)
            .unwrap_or_else(|| ctx.dir_name());

        let mut payload = Payload::new(name, "");
        for entry in [build, settings].into_iter().flatten() {
            payload.add_path(ctx.relative(entry.file_name()));
            ctx.matcher
                .add_tech(&mut payload, "gradle", format!("matched file: {}", entry.file_name()));
        }

        if let Some(entry) = build {
            let content = ctx.read(entry)?;
            let dependencies = Self::dependency_parser()?.parse(&content)?;
            ctx.matcher.apply_dependencies(&mut payload, dependencies);
        }
        if let Some(content) = &settings_content {
            let projects = Self::included_projects(content);
            if !projects.is_empty() {
                payload.set_property("subprojects", projects.join(","));
            }
        }

        Ok(vec![Fragment::Named(payload)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::run;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_build_with_settings_companion() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "shop/build.gradle.kts",
            r#"
plugins { id("org.springframework.boot") version "3.2.0" }

dependencies {
    implementation("org.springframework.boot:spring-boot-starter-web")
    runtimeOnly("org.postgresql:postgresql:42.7.1")
    testImplementation 'junit:junit:4.13.2'
}
"#,
        );
        fs.add_file(
            "shop/settings.gradle.kts",
            "rootProject.name = \"shop-service\"\ninclude(\":api\", \":core\")\n",
        );

        let fragments = run(&GradleDetector, &fs, "shop").unwrap();
        let Fragment::Named(payload) = &fragments[0] else {
            panic!("expected named fragment");
        };
        assert_eq!(payload.name, "shop-service");
        assert!(payload.paths.contains("shop/build.gradle.kts"));
        assert!(payload.paths.contains("shop/settings.gradle.kts"));
        assert_eq!(payload.techs["gradle"].len(), 2);
        assert_eq!(payload.dependencies.len(), 3);
        assert_eq!(payload.dependencies[1].version.as_deref(), Some("42.7.1"));
        assert_eq!(payload.dependencies[0].version, None);
        assert!(payload.has_tech("spring"));
        assert!(payload.has_tech("postgresql"));
        assert_eq!(payload.properties["subprojects"], "api,core");
    }

    #[test]
    fn test_build_without_settings_uses_directory_name() {
        let fs = MockFileSystem::new();
        fs.add_file("legacy-app/build.gradle", "dependencies {\n  compile 'mysql:mysql-connector-java:8.0.33'\n}\n");

        let fragments = run(&GradleDetector, &fs, "legacy-app").unwrap();
        let payload = fragments[0].payload();
        assert_eq!(payload.name, "legacy-app");
        assert_eq!(payload.paths.len(), 1);
        assert!(payload.has_tech("mysql"));
    }

    #[test]
    fn test_settings_only() {
        let fs = MockFileSystem::new();
        fs.add_file("settings.gradle", "rootProject.name = 'mono'\ninclude 'a', 'b'\n");

        let fragments = run(&GradleDetector, &fs, "").unwrap();
        let payload = fragments[0].payload();
        assert_eq!(payload.name, "mono");
        assert!(payload.dependencies.is_empty());
        assert_eq!(payload.properties["subprojects"], "a,b");
    }
}
