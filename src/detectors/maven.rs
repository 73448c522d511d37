//! Maven projects (`pom.xml`).

use super::{ComponentDetector, DetectionContext};
use crate::payload::{Dependency, Fragment, Payload};
use anyhow::{Context, Result};
use roxmltree::{Document, Node};

const MANIFEST: &str = "pom.xml";

pub struct MavenDetector;

fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children()
        .find(|c| c.has_tag_name(tag))
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl MavenDetector {
    /// `<dependency>` entries under `<dependencies>` and `<dependencyManagement>`.
    fn dependencies(doc: &Document<'_>) -> Vec<Dependency> {
        let mut dependencies: Vec<Dependency> = Vec::new();
        for node in doc.descendants().filter(|n| n.has_tag_name("dependency")) {
            let (Some(group), Some(artifact)) = (child_text(node, "groupId"), child_text(node, "artifactId")) else {
                continue;
            };
            let name = format!("{}:{}", group, artifact);
            if dependencies.iter().any(|d| d.name == name) {
                continue;
            }
            let version = child_text(node, "version").map(String::from);
            dependencies.push(Dependency::new("maven", name, version));
        }
        dependencies
    }
}

impl ComponentDetector for MavenDetector {
    fn name(&self) -> &'static str {
        "maven"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Fragment>> {
        let Some(entry) = ctx.file(MANIFEST) else {
            return Ok(Vec::new());
        };
        let content = ctx.read(entry)?;
        let doc = Document::parse(&content).with_context(|| format!("Invalid {}", ctx.relative(MANIFEST)))?;

        // Only direct children of <project>; nested artifactIds belong to
        // parents, plugins and dependencies.
        let project = doc.root_element();
        let artifact_id = child_text(project, "artifactId");

        let mut payload = Payload::new(artifact_id.unwrap_or_default(), ctx.relative(MANIFEST));
        let reason = format!("matched file: {}", MANIFEST);
        ctx.matcher.add_tech(&mut payload, "maven", reason.clone());
        ctx.matcher.add_tech(&mut payload, "java", reason);
        ctx.matcher
            .apply_dependencies(&mut payload, Self::dependencies(&doc));

        if let Some(licenses) = project.children().find(|c| c.has_tag_name("licenses")) {
            for license in licenses.children().filter(|c| c.has_tag_name("license")) {
                if let Some(name) = child_text(license, "name") {
                    payload.add_license(name, ctx.relative(MANIFEST));
                }
            }
        }
        if let Some(group) = child_text(project, "groupId") {
            payload.set_property("groupId", group);
        }
        if let Some(version) = child_text(project, "version") {
            payload.set_property("version", version);
        }
        if let Some(packaging) = child_text(project, "packaging") {
            payload.set_property("packaging", packaging);
        }
        let modules = doc
            .descendants()
            .filter(|n| n.has_tag_name("module"))
            .count();
        if modules > 0 {
            payload.set_property("modules", modules.to_string());
        }

        Ok(vec![match artifact_id {
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

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>org.springframework.boot</groupId>
    <artifactId>spring-boot-starter-parent</artifactId>
    <version>3.2.0</version>
  </parent>
  <groupId>com.acme</groupId>
  <artifactId>orders</artifactId>
  <version>1.4.0</version>
  <packaging>jar</packaging>
  <licenses>
    <license><name>Apache-2.0</name></license>
  </licenses>
  <dependencies>
    <dependency>
      <groupId>org.springframework.boot</groupId>
      <artifactId>spring-boot-starter-web</artifactId>
    </dependency>
    <dependency>
      <groupId>org.postgresql</groupId>
      <artifactId>postgresql</artifactId>
      <version>42.7.1</version>
    </dependency>
  </dependencies>
</project>
"#;

    #[test]
    fn test_pom_with_dependencies() {
        let fs = MockFileSystem::new();
        fs.add_file("orders/pom.xml", POM);

        let fragments = run(&MavenDetector, &fs, "orders").unwrap();
        let Fragment::Named(payload) = &fragments[0] else {
            panic!("expected named fragment");
        };
        assert_eq!(payload.name, "orders");
        assert_eq!(payload.dependencies.len(), 2);
        assert_eq!(payload.dependencies[1].name, "org.postgresql:postgresql");
        assert!(payload.has_tech("spring"));
        assert!(payload.has_tech("postgresql"));
        assert_eq!(payload.primary_techs, vec!["java"]);
        assert_eq!(payload.licenses[0].license, "Apache-2.0");
        assert_eq!(payload.properties["packaging"], "jar");
    }

    #[test]
    fn test_pom_without_artifact_is_virtual() {
        let fs = MockFileSystem::new();
        fs.add_file("pom.xml", "<project><modelVersion>4.0.0</modelVersion></project>");
        let fragments = run(&MavenDetector, &fs, "").unwrap();
        assert!(fragments[0].is_virtual());
    }

    #[test]
    fn test_malformed_pom_fails() {
        let fs = MockFileSystem::new();
        fs.add_file("pom.xml", "<project><artifactId>x</project>");
        assert!(run(&MavenDetector, &fs, "").is_err());
    }
}
