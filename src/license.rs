//! License evidence from well-known license files.

use crate::fs::{DirEntry, FileSystem};
use crate::payload::Payload;
use std::path::PathBuf;
use tracing::warn;

const LICENSE_STEMS: &[&str] = &["license", "licence", "copying", "unlicense"];
const LICENSE_EXTENSIONS: &[&str] = &["", "md", "txt", "rst"];

/// Bytes read from a license file, enough for any header.
const LICENSE_READ_LIMIT: usize = 16 * 1024;

/// SPDX id and phrases that must all appear (case-insensitive).
/// Checked in order; the first full match wins.
const LICENSE_MARKERS: &[(&str, &[&str])] = &[
    ("AGPL-3.0", &["gnu affero general public license"]),
    ("LGPL-3.0", &["gnu lesser general public license", "version 3"]),
    ("GPL-3.0", &["gnu general public license", "version 3"]),
    ("GPL-2.0", &["gnu general public license", "version 2"]),
    ("Apache-2.0", &["apache license", "version 2.0"]),
    ("MPL-2.0", &["mozilla public license", "2.0"]),
    ("Unlicense", &["this is free and unencumbered software released into the public domain"]),
    ("MIT", &["permission is hereby granted, free of charge"]),
    ("BSD-3-Clause", &["redistribution and use in source and binary forms", "neither the name"]),
    ("BSD-2-Clause", &["redistribution and use in source and binary forms"]),
    ("ISC", &["permission to use, copy, modify, and/or distribute this software"]),
];

pub const UNKNOWN_LICENSE: &str = "unknown";

/// `LICENSE`, `LICENCE.md`, `copying.txt`, `LICENSE-MIT` and friends.
pub fn is_license_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    let (stem, extension) = match lower.rsplit_once('.') {
        Some((stem, ext)) if LICENSE_EXTENSIONS.contains(&ext) => (stem.to_string(), ext.to_string()),
        _ => (lower.clone(), String::new()),
    };
    if !LICENSE_EXTENSIONS.contains(&extension.as_str()) {
        return false;
    }
    LICENSE_STEMS
        .iter()
        .any(|s| stem == *s || stem.starts_with(&format!("{}-", s)))
}

pub fn identify_license(text: &str) -> Option<&'static str> {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    LICENSE_MARKERS
        .iter()
        .find(|(_, phrases)| phrases.iter().all(|p| normalized.contains(p)))
        .map(|(id, _)| *id)
}

/// Add one license entry per license file in `listing`.
///
/// `relative_dir` is the directory's path relative to the scan root and is
/// used for provenance. Returns files that could not be read.
pub fn add_license_evidence(
    node: &mut Payload,
    fs: &dyn FileSystem,
    listing: &[DirEntry],
    relative_dir: &str,
) -> Vec<PathBuf> {
    let mut unreadable = Vec::new();
    for entry in listing.iter().filter(|e| e.is_file() && is_license_file(e.file_name())) {
        let bytes = match fs.read_bytes(entry.path(), LICENSE_READ_LIMIT) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Failed to read license file");
                unreadable.push(entry.path().to_path_buf());
                continue;
            }
        };
        let license = identify_license(&String::from_utf8_lossy(&bytes)).unwrap_or(UNKNOWN_LICENSE);
        node.add_license(license, join_relative(relative_dir, entry.file_name()));
    }
    unreadable
}

pub(crate) fn join_relative(dir: &str, name: &str) -> String {
    if dir.is_empty() || dir == "." {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}
