//! Destinations, locations and payloads for publishing

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::generation::{Artifact, LanguageId};
use crate::publish::PublishError;

static REPOSITORY_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").unwrap());

/// What kind of artifact lives at a destination
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Config,
    Sdk(LanguageId),
}

/// Stable identifier of where an artifact is published.
///
/// Publishing twice to the same key updates one location instead of
/// creating a second one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationKey {
    pub namespace: String,
    pub kind: ArtifactKind,
}

impl DestinationKey {
    pub fn config(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind: ArtifactKind::Config,
        }
    }

    pub fn sdk(namespace: impl Into<String>, language: LanguageId) -> Self {
        Self {
            namespace: namespace.into(),
            kind: ArtifactKind::Sdk(language),
        }
    }

    /// Repository name: `<namespace>-config` or `<namespace>-<lang>-sdk`
    pub fn repo_name(&self) -> String {
        match &self.kind {
            ArtifactKind::Config => format!("{}-config", self.namespace),
            ArtifactKind::Sdk(language) => format!("{}-{}-sdk", self.namespace, language),
        }
    }

    /// Check the repository name against hosting rules
    pub fn validate(&self) -> Result<String, PublishError> {
        let name = self.repo_name();
        if name == "." || name == ".." || !REPOSITORY_NAME.is_match(&name) {
            return Err(PublishError::permanent(
                &name,
                "repository names must be 1-100 characters of A-Z, a-z, 0-9, '.', '-' or '_'",
            ));
        }
        Ok(name)
    }
}

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repo_name())
    }
}

/// Address of a published artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoLocation(Url);

impl RepoLocation {
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RepoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// File set plus repository metadata handed to a publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishArtifact {
    pub description: String,
    pub files: Vec<Artifact>,
}

impl PublishArtifact {
    pub fn new(description: impl Into<String>, files: Vec<Artifact>) -> Self {
        Self {
            description: description.into(),
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_names() {
        assert_eq!(DestinationKey::config("acme").repo_name(), "acme-config");
        assert_eq!(
            DestinationKey::sdk("acme", LanguageId::new("python")).repo_name(),
            "acme-python-sdk"
        );
    }

    #[test]
    fn test_validate_accepts_normalized_names() {
        assert_eq!(DestinationKey::config("acme-corp").validate().unwrap(), "acme-corp-config");
    }

    #[test]
    fn test_validate_rejects_invalid_names() {
        let too_long = DestinationKey::config("a".repeat(100));
        assert!(!too_long.validate().unwrap_err().is_transient());

        let bad_chars = DestinationKey::config("acme corp");
        assert!(bad_chars.validate().is_err());

        let slash = DestinationKey::sdk("acme", LanguageId::new("py/thon"));
        assert!(slash.validate().is_err());
    }
}
