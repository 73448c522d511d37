//! Rule catalogs feeding real scans

use stackprobe::{
    DetectorRegistry, RealFileSystem, RuleCatalog, RuleLoadError, Scanner, StackprobeConfig,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const CUSTOM_RULES: &str = r#"
- tech: billing-sdk
  name: Billing SDK
  type: saas
  dependencies:
    - type: npm
      name: "/^@acme/billing/"
- tech: feature-flags
  name: Feature Flags
  type: saas
  component: true
  env: [FLAGS_]
- tech: broken
  type: saas
"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn scan_with(catalog: RuleCatalog, root: &Path) -> stackprobe::ScanReport {
    Scanner::new(
        Arc::new(RealFileSystem::new()),
        Arc::new(catalog),
        Arc::new(DetectorRegistry::with_defaults()),
    )
    .scan(root)
    .unwrap()
}

fn catalog_with_rules_dir(rules: &Path) -> RuleCatalog {
    let config = StackprobeConfig {
        rule_dirs: vec![rules.to_path_buf()],
        ..Default::default()
    };
    config.load_catalog(&RealFileSystem::new()).unwrap()
}

#[test]
fn test_builtin_catalog_has_no_rejections() {
    let catalog = RuleCatalog::builtin().unwrap();
    assert!(catalog.rejected().is_empty(), "{:?}", catalog.rejected());
    for tech in ["npm", "cargo", "postgresql", "redis", "github-actions"] {
        assert!(catalog.get(tech).is_some(), "missing builtin rule {}", tech);
    }
}

#[test]
fn test_custom_rules_extend_builtin() {
    let rules = TempDir::new().unwrap();
    write(rules.path(), "saas.yaml", CUSTOM_RULES);
    write(rules.path(), "notes.txt", "not a rule file");
    let catalog = catalog_with_rules_dir(rules.path());

    assert!(catalog.get("billing-sdk").is_some());
    assert!(catalog.get("npm").is_some());
    assert_eq!(catalog.rejected().len(), 1);
    assert_eq!(catalog.rejected()[0].index, 2);
    assert_eq!(catalog.rejected()[0].tech.as_deref(), Some("broken"));

    let project = TempDir::new().unwrap();
    write(
        project.path(),
        "checkout/package.json",
        r#"{"name": "checkout", "dependencies": {"@acme/billing-node": "2.0.0"}}"#,
    );
    write(project.path(), "checkout/.env", "FLAGS_KEY=abc\nPORT=3000\n");

    let report = scan_with(catalog, project.path());
    let checkout = report.tree.child("checkout").unwrap();
    assert_eq!(
        checkout.techs()["billing-sdk"],
        vec!["matched dependency: @acme/billing-node".to_string()]
    );
    assert_eq!(
        checkout.techs()["feature-flags"],
        vec!["matched env: FLAGS_KEY".to_string()]
    );
    let flags = checkout.child("Feature Flags").unwrap();
    assert_eq!(flags.implicit(), Some("feature-flags"));
}

#[test]
fn test_builtin_tech_cannot_be_redefined() {
    let rules = TempDir::new().unwrap();
    write(
        rules.path(),
        "override.yml",
        "- tech: redis\n  name: Not Redis\n  type: db\n",
    );
    let catalog = catalog_with_rules_dir(rules.path());

    assert_eq!(catalog.get("redis").unwrap().name, "Redis");
    assert_eq!(catalog.rejected().len(), 1);
    assert!(catalog.rejected()[0].reason.contains("duplicate"));
}

#[test]
fn test_unparseable_rule_file_fails_load() {
    let rules = TempDir::new().unwrap();
    write(rules.path(), "bad.yaml", "tech: [unterminated");
    let config = StackprobeConfig {
        rule_dirs: vec![rules.path().to_path_buf()],
        ..Default::default()
    };
    let err = config.load_catalog(&RealFileSystem::new()).unwrap_err();
    assert!(matches!(err, RuleLoadError::Parse { .. }));
}

#[test]
fn test_content_gated_rules() {
    let project = TempDir::new().unwrap();
    write(
        project.path(),
        "schemas/order.json",
        r#"{"$schema": "https://json-schema.org/draft/2020-12/schema"}"#,
    );
    write(project.path(), "schemas/sample.json", r#"{"id": 1}"#);
    write(
        project.path(),
        "deploy/app.yaml",
        "apiVersion: apps/v1\nkind: Deployment\n",
    );
    write(project.path(), "deploy/values.yaml", "replicas: 2\n");

    let report = scan_with(RuleCatalog::builtin().unwrap(), project.path());
    let techs = report.tree.techs();

    assert_eq!(techs["jsonschema"].len(), 1);
    assert!(techs["jsonschema"][0].contains("order.json"));
    assert_eq!(techs["kubernetes"].len(), 1);
    assert!(techs["kubernetes"][0].contains("app.yaml"));
}

#[test]
fn test_rules_only_catalog() {
    let rules = TempDir::new().unwrap();
    write(rules.path(), "saas.yaml", CUSTOM_RULES);
    let config = StackprobeConfig {
        rule_dirs: vec![rules.path().to_path_buf()],
        builtin_rules: false,
        ..Default::default()
    };
    let catalog = config.load_catalog(&RealFileSystem::new()).unwrap();
    assert_eq!(catalog.len(), 2);
    assert!(catalog.get("npm").is_none());
}
