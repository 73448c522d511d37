//! Output formatting for scan results and the rule catalog
//!
//! JSON and YAML serialize the report types as they are. The human format is
//! an indented tree meant for a terminal.
//!
//! # Example
//!
//! ```ignore
//! use stackprobe::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! let output = formatter.format_report(&report)?;
//! println!("{}", output);
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;

use crate::aggregate::AggregateSummary;
use crate::component::{Component, ScanReport};
use crate::error::RuleError;
use crate::rules::RuleCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    /// Indented text tree
    Human,
}

/// One catalog entry as printed by `stackprobe rules`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    pub tech: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub primary: bool,
    pub component: bool,
    pub source: String,
}

#[derive(Debug, Serialize)]
struct CatalogListing {
    rules: Vec<RuleSummary>,
    rejected: Vec<String>,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Full tree with metadata.
    pub fn format_report(&self, report: &ScanReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report, "scan report"),
            OutputFormat::Yaml => to_yaml(report, "scan report"),
            OutputFormat::Human => Ok(self.format_report_human(report)),
        }
    }

    pub fn format_summary(&self, summary: &AggregateSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(summary, "aggregated summary"),
            OutputFormat::Yaml => to_yaml(summary, "aggregated summary"),
            OutputFormat::Human => Ok(self.format_summary_human(summary)),
        }
    }

    pub fn format_catalog(&self, catalog: &RuleCatalog) -> Result<String> {
        let listing = CatalogListing {
            rules: rule_summaries(catalog),
            rejected: catalog.rejected().iter().map(RuleError::to_string).collect(),
        };
        match self.format {
            OutputFormat::Json => to_json(&listing, "rule catalog"),
            OutputFormat::Yaml => to_yaml(&listing, "rule catalog"),
            OutputFormat::Human => Ok(self.format_catalog_human(&listing)),
        }
    }

    fn format_report_human(&self, report: &ScanReport) -> String {
        let mut output = String::new();
        let meta = &report.metadata;
        let _ = writeln!(output, "Scan of {} ({} ms)", meta.root, meta.duration_ms);
        if !meta.subfolders.is_empty() {
            let _ = writeln!(output, "Subfolders: {}", meta.subfolders.join(", "));
        }
        let _ = writeln!(
            output,
            "Directories: {} visited, {} skipped; files skipped: {}",
            meta.counters.directories_visited,
            meta.counters.directories_skipped,
            meta.counters.files_skipped
        );
        if meta.cancelled {
            let _ = writeln!(output, "Scan was cancelled, results are partial");
        }
        output.push('\n');
        write_component(&mut output, &report.tree, 0);
        output
    }

    fn format_summary_human(&self, summary: &AggregateSummary) -> String {
        let mut output = String::new();
        let _ = writeln!(
            output,
            "Scan of {}: {} components",
            summary.metadata.root, summary.components
        );
        if !summary.primary_techs.is_empty() {
            let _ = writeln!(output, "Primary: {}", summary.primary_techs.join(", "));
        }
        if !summary.techs.is_empty() {
            let techs: Vec<&str> = summary.techs.keys().map(String::as_str).collect();
            let _ = writeln!(output, "Techs: {}", techs.join(", "));
        }
        if !summary.languages.is_empty() {
            let languages: Vec<String> = summary
                .languages
                .iter()
                .map(|(name, count)| format!("{} ({})", name, count))
                .collect();
            let _ = writeln!(output, "Languages: {}", languages.join(", "));
        }
        for repository in &summary.repositories {
            if let Some(url) = &repository.remote_url {
                let _ = writeln!(output, "Repository: {}", url);
            }
        }
        if !summary.licenses.is_empty() {
            let licenses: Vec<&str> = summary.licenses.iter().map(|l| l.license.as_str()).collect();
            let _ = writeln!(output, "Licenses: {}", licenses.join(", "));
        }
        let _ = writeln!(output, "Dependencies: {}", summary.dependencies.len());
        output
    }

    fn format_catalog_human(&self, listing: &CatalogListing) -> String {
        let mut output = String::new();
        let width = listing.rules.iter().map(|r| r.tech.len()).max().unwrap_or(0);
        for rule in &listing.rules {
            let mut flags = Vec::new();
            if rule.primary {
                flags.push("primary");
            }
            if rule.component {
                flags.push("component");
            }
            let _ = writeln!(
                output,
                "{:<width$}  {} [{}]{}",
                rule.tech,
                rule.name,
                rule.category,
                if flags.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", flags.join(", "))
                },
                width = width
            );
        }
        let _ = writeln!(output, "\n{} rules loaded", listing.rules.len());
        if !listing.rejected.is_empty() {
            let _ = writeln!(output, "{} rejected:", listing.rejected.len());
            for rejected in &listing.rejected {
                let _ = writeln!(output, "  {}", rejected);
            }
        }
        output
    }
}

pub fn rule_summaries(catalog: &RuleCatalog) -> Vec<RuleSummary> {
    let mut rules: Vec<RuleSummary> = catalog
        .rules()
        .iter()
        .map(|rule| RuleSummary {
            tech: rule.tech.clone(),
            name: rule.name.clone(),
            category: rule.category.clone(),
            primary: rule.is_primary,
            component: rule.creates_component,
            source: rule.source.clone(),
        })
        .collect();
    rules.sort_by(|a, b| a.tech.cmp(&b.tech));
    rules
}

fn write_component(output: &mut String, node: &Component, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut line = format!("{}{} [{}]", indent, node.name(), node.id());
    if let Some(tech) = node.implicit() {
        let _ = write!(line, " implicit:{}", tech);
    }
    let _ = writeln!(output, "{}", line);

    if !node.paths().is_empty() {
        let _ = writeln!(output, "{}  paths: {}", indent, node.paths().join(", "));
    }
    if !node.primary_techs().is_empty() {
        let _ = writeln!(output, "{}  primary: {}", indent, node.primary_techs().join(", "));
    }
    if !node.techs().is_empty() {
        let techs: Vec<&str> = node.techs().keys().map(String::as_str).collect();
        let _ = writeln!(output, "{}  techs: {}", indent, techs.join(", "));
    }
    if !node.dependencies().is_empty() {
        let _ = writeln!(output, "{}  dependencies: {}", indent, node.dependencies().len());
    }
    for child in node.children() {
        write_component(output, child, depth + 1);
    }
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {} to JSON", what))
}

fn to_yaml<T: Serialize>(value: &T, what: &str) -> Result<String> {
    serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
}
