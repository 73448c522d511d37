//! Command handlers. Each returns the process exit code.

use super::commands::{RulesArgs, ScanArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::StackprobeConfig;
use crate::detectors::DetectorRegistry;
use crate::engine::Scanner;
use crate::fs::{FileSystem, RealFileSystem};
use crate::progress::LoggingHandler;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub fn handle_scan(args: &ScanArgs) -> i32 {
    match run_scan(args) {
        Ok(()) => 0,
        Err(e) => {
            error!("Scan failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub fn handle_rules(args: &RulesArgs) -> i32 {
    match run_rules(args) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

/// Config file and environment first, then command-line flags on top.
pub fn resolve_scan_config(args: &ScanArgs) -> Result<StackprobeConfig> {
    let mut config = StackprobeConfig::load(args.config.as_deref())?;
    config.exclude.extend(args.exclude.iter().cloned());
    config.rule_dirs.extend(args.rules.iter().cloned());
    if args.no_builtin_rules {
        config.builtin_rules = false;
    }
    if args.max_depth.is_some() {
        config.max_depth = args.max_depth;
    }
    if args.id.is_some() {
        config.id = args.id.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run_scan(args: &ScanArgs) -> Result<()> {
    let config = resolve_scan_config(args)?;
    debug!("{}", config);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem::new());
    let catalog = config
        .load_catalog(fs.as_ref())
        .context("Failed to load rule catalog")?;
    for rejected in catalog.rejected() {
        warn!("Rule rejected: {}", rejected);
    }

    let root = args.path.clone().unwrap_or_else(|| PathBuf::from("."));
    let scanner = Scanner::new(fs, Arc::new(catalog), Arc::new(DetectorRegistry::with_defaults()))
        .with_config(config.scan_config())
        .with_progress(Arc::new(LoggingHandler));

    let report = if args.subfolders.is_empty() {
        scanner.scan(&root)?
    } else {
        scanner.scan_multi(&root, &args.subfolders)?
    };
    info!(
        components = report.component_count(),
        duration_ms = report.metadata.duration_ms,
        "Scan finished"
    );

    let formatter = OutputFormatter::new(args.format.into());
    let output = if args.aggregate {
        formatter.format_summary(&report.aggregate())?
    } else {
        formatter.format_report(&report)?
    };
    write_output(&output, args.output.as_deref())
}

fn run_rules(args: &RulesArgs) -> Result<()> {
    let mut config = StackprobeConfig::load(args.config.as_deref())?;
    config.rule_dirs.extend(args.rules.iter().cloned());
    if args.no_builtin_rules {
        config.builtin_rules = false;
    }

    let catalog = config
        .load_catalog(&RealFileSystem::new())
        .context("Failed to load rule catalog")?;
    let format: OutputFormat = args.format.into();
    let output = OutputFormatter::new(format).format_catalog(&catalog)?;
    write_output(&output, None)
}

fn write_output(output: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, output)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!(path = %path.display(), "Output written");
        }
        None => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}
