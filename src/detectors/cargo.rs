//! Rust crates and workspaces (`Cargo.toml`).

use super::parsers::{toml_path, TomlDependencyParser};
use super::{ComponentDetector, DetectionContext};
use crate::payload::{Fragment, Payload};
use anyhow::{Context, Result};

const MANIFEST: &str = "Cargo.toml";

pub struct CargoDetector;

impl ComponentDetector for CargoDetector {
    fn name(&self) -> &'static str {
        "cargo"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Fragment>> {
        let Some(entry) = ctx.file(MANIFEST) else {
            return Ok(Vec::new());
        };
        let content = ctx.read(entry)?;
        let manifest: toml::Value =
            toml::from_str(&content).with_context(|| format!("Invalid {}", ctx.relative(MANIFEST)))?;

        let name = toml_path(&manifest, "package.name")
            .and_then(|v| v.as_str())
            .filter(|n| !n.is_empty());
        let mut payload = Payload::new(name.unwrap_or_default(), ctx.relative(MANIFEST));
        let reason = format!("matched file: {}", MANIFEST);
        ctx.matcher.add_tech(&mut payload, "cargo", reason.clone());
        ctx.matcher.add_tech(&mut payload, "rust", reason);

        let parser = TomlDependencyParser {
            ecosystem: "cargo",
            dependencies_keys: &[
                "dependencies",
                "dev-dependencies",
                "build-dependencies",
                "workspace.dependencies",
            ],
            skip: &[],
        };
        ctx.matcher
            .apply_dependencies(&mut payload, parser.parse_value(&manifest));

        if let Some(license) = toml_path(&manifest, "package.license").and_then(|v| v.as_str()) {
            payload.add_license(license, ctx.relative(MANIFEST));
        }
        if let Some(version) = toml_path(&manifest, "package.version").and_then(|v| v.as_str()) {
            payload.set_property("version", version);
        }
        if let Some(edition) = toml_path(&manifest, "package.edition").and_then(|v| v.as_str()) {
            payload.set_property("edition", edition);
        }
        if let Some(members) = toml_path(&manifest, "workspace.members").and_then(|v| v.as_array()) {
            payload.set_property("workspace.members", members.len().to_string());
        }

        Ok(vec![match name {
            Some(_) => Fragment::Named(payload),
            None => Fragment::Virtual(payload),
        }])
    }
}
