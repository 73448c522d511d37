//! File-extension language classification.

use crate::fs::DirEntry;
use std::collections::BTreeMap;

/// Language display name and the extensions (lowercase, no dot) it owns.
pub const LANGUAGES: &[(&str, &[&str])] = &[
    ("Rust", &["rs"]),
    ("Go", &["go"]),
    ("Python", &["py", "pyi"]),
    ("JavaScript", &["js", "mjs", "cjs", "jsx"]),
    ("TypeScript", &["ts", "mts", "cts", "tsx"]),
    ("Java", &["java"]),
    ("Kotlin", &["kt", "kts"]),
    ("Scala", &["scala", "sc"]),
    ("Groovy", &["groovy", "gradle"]),
    ("Ruby", &["rb", "rake"]),
    ("PHP", &["php"]),
    ("C#", &["cs"]),
    ("F#", &["fs", "fsx"]),
    ("C++", &["cpp", "cc", "cxx", "hpp", "hh", "hxx"]),
    ("C", &["c", "h"]),
    ("Elixir", &["ex", "exs"]),
    ("Erlang", &["erl", "hrl"]),
    ("Swift", &["swift"]),
    ("Objective-C", &["m", "mm"]),
    ("Dart", &["dart"]),
    ("Lua", &["lua"]),
    ("Shell", &["sh", "bash", "zsh"]),
    ("PowerShell", &["ps1", "psm1"]),
    ("SQL", &["sql"]),
    ("HTML", &["html", "htm"]),
    ("CSS", &["css", "scss", "sass", "less"]),
    ("Vue", &["vue"]),
    ("Svelte", &["svelte"]),
    ("HCL", &["tf", "hcl"]),
    ("Protocol Buffers", &["proto"]),
];

pub fn language_for_extension(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(_, extensions)| extensions.contains(&extension.as_str()))
        .map(|(name, _)| *name)
}

/// Files per language among the listing's regular files.
pub fn count_languages(listing: &[DirEntry]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for entry in listing.iter().filter(|e| e.is_file()) {
        if let Some(language) = entry.extension().as_deref().and_then(language_for_extension) {
            *counts.entry(language.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, MockFileSystem};
    use std::path::Path;
    use yare::parameterized;

    #[parameterized(
        rust = { "rs", Some("Rust") },
        upper = { "TSX", Some("TypeScript") },
        header = { "h", Some("C") },
        terraform = { "tf", Some("HCL") },
        unknown = { "xyz", None },
    )]
    fn test_language_for_extension(ext: &str, expected: Option<&str>) {
        assert_eq!(language_for_extension(ext), expected);
    }

    #[test]
    fn test_extensions_unique() {
        let mut seen = std::collections::HashSet::new();
        for (_, extensions) in LANGUAGES {
            for ext in *extensions {
                assert!(seen.insert(*ext), "duplicate extension {}", ext);
            }
        }
    }

    #[test]
    fn test_count_languages_skips_dirs_and_unknown() {
        let fs = MockFileSystem::new();
        fs.add_file("main.rs", "");
        fs.add_file("lib.rs", "");
        fs.add_file("README.md", "");
        fs.add_dir("src.rs");

        let counts = count_languages(&fs.read_dir(Path::new("/mock")).unwrap());
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["Rust"], 2);
    }
}
