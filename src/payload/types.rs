use serde::{Deserialize, Serialize};

/// A third-party dependency declared by a manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Ecosystem tag (`npm`, `cargo`, `python`, `docker`, ...)
    #[serde(rename = "type")]
    pub ecosystem: String,
    pub name: String,
    /// Resolved version or ref, when the manifest states one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Dependency {
    pub fn new(ecosystem: impl Into<String>, name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            ecosystem: ecosystem.into(),
            name: name.into(),
            version,
        }
    }
}

/// License identifier with the file it was found in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct License {
    pub license: String,
    pub source: String,
}

/// Repository identity of a component's checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Remote URL with credentials removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}
