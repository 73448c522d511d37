//! Node.js packages (`package.json`).

use super::parsers::JsonDependencyParser;
use super::{ComponentDetector, DetectionContext};
use crate::payload::{Fragment, Payload};
use anyhow::{Context, Result};

const MANIFEST: &str = "package.json";

/// Lockfiles in precedence order and the package manager each implies.
const LOCKFILES: &[(&str, &str)] = &[
    ("bun.lockb", "bun"),
    ("bun.lock", "bun"),
    ("pnpm-lock.yaml", "pnpm"),
    ("yarn.lock", "yarn"),
    ("package-lock.json", "npm"),
];

const DEPENDENCY_KEYS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

pub struct NpmDetector;

impl NpmDetector {
    /// Package manager tech and the reason for it.
    fn package_manager(ctx: &DetectionContext<'_>, manifest: &serde_json::Value) -> (&'static str, String) {
        if let Some((file, tech)) = LOCKFILES.iter().find(|(file, _)| ctx.has_file(file)) {
            return (tech, format!("matched file: {}", file));
        }
        if let Some(declared) = manifest.get("packageManager").and_then(|v| v.as_str()) {
            let tool = declared.split('@').next().unwrap_or(declared);
            if let Some((_, tech)) = LOCKFILES.iter().find(|(_, tech)| *tech == tool) {
                return (tech, format!("matched packageManager: {}", declared));
            }
        }
        ("npm", format!("matched file: {}", MANIFEST))
    }
}

impl ComponentDetector for NpmDetector {
    fn name(&self) -> &'static str {
        "npm"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Fragment>> {
        let Some(entry) = ctx.file(MANIFEST) else {
            return Ok(Vec::new());
        };
        let content = ctx.read(entry)?;
        let manifest: serde_json::Value =
            serde_json::from_str(&content).with_context(|| format!("Invalid {}", ctx.relative(MANIFEST)))?;

        let name = manifest
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|n| !n.is_empty());
        let mut payload = Payload::new(name.unwrap_or_default(), ctx.relative(MANIFEST));

        let (tech, reason) = Self::package_manager(ctx, &manifest);
        ctx.matcher.add_tech(&mut payload, tech, reason);

        let parser = JsonDependencyParser {
            ecosystem: "npm",
            dependencies_keys: DEPENDENCY_KEYS,
        };
        ctx.matcher
            .apply_dependencies(&mut payload, parser.parse_value(&manifest));

        if let Some(license) = manifest.get("license").and_then(|v| v.as_str()) {
            payload.add_license(license, ctx.relative(MANIFEST));
        }
        if let Some(version) = manifest.get("version").and_then(|v| v.as_str()) {
            payload.set_property("version", version);
        }
        if let Some(node) = manifest
            .get("engines")
            .and_then(|e| e.get("node"))
            .and_then(|v| v.as_str())
        {
            payload.set_property("engines.node", node);
        }
        if manifest.get("workspaces").is_some() {
            payload.set_property("workspaces", "true");
        }

        Ok(vec![match name {
            Some(_) => Fragment::Named(payload),
            None => Fragment::Virtual(payload),
        }])
    }
}
