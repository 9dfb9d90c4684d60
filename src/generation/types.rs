//! Core types for the generation domain

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identifier of a target language as it appears at the request boundary.
///
/// Identifiers are trimmed and lowercased on construction, so `" Python "`
/// and `"python"` name the same language. Whether an identifier is supported
/// is decided by the language policy table, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageId(String);

impl LanguageId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LanguageId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Generated artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path relative to the project root
    pub path: PathBuf,
    pub content: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Manifest describing a generated project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectManifest {
    pub name: String,
    pub version: String,
    pub language: LanguageId,
    pub generator: String,
}

/// A self-contained buildable unit produced by a language generator
#[derive(Debug, Clone)]
pub struct GeneratedProject {
    pub manifest: ProjectManifest,
    pub artifacts: Vec<Artifact>,
}

impl GeneratedProject {
    /// Look up an artifact by its relative path
    pub fn artifact(&self, path: &str) -> Option<&Artifact> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.path == std::path::Path::new(path))
    }
}
