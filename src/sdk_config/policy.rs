//! Fixed table of supported languages
//!
//! This table is the single point of extension: adding a language means one
//! entry here plus one generator registration.

use serde::Serialize;

use crate::generation::LanguageId;

/// Version of the generator CLI pinned in `fern.config.json`
pub const GENERATOR_CLI_VERSION: &str = "0.45.3";

/// Package registry an SDK is published to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageRegistry {
    Pypi,
    Npm,
}

impl PackageRegistry {
    /// Key naming the package in the registry's `output` block
    pub fn package_name_key(&self) -> &'static str {
        match self {
            PackageRegistry::Pypi => "pypi-package-name",
            PackageRegistry::Npm => "npm-package-name",
        }
    }
}

/// Everything needed to configure one language's SDK
#[derive(Debug, Clone, Copy)]
pub struct LanguagePolicy {
    pub id: &'static str,
    pub display_name: &'static str,
    pub generator: &'static str,
    pub generator_version: &'static str,
    pub registry: PackageRegistry,
    /// Package name with `{namespace}` substituted
    pub package_name_pattern: &'static str,
    pub group: &'static str,
}

impl LanguagePolicy {
    pub fn package_name(&self, namespace: &str) -> String {
        self.package_name_pattern.replace("{namespace}", namespace)
    }
}

static POLICIES: &[LanguagePolicy] = &[
    LanguagePolicy {
        id: "python",
        display_name: "Python",
        generator: "fernapi/fern-python-sdk",
        generator_version: "4.3.8",
        registry: PackageRegistry::Pypi,
        package_name_pattern: "{namespace}-sdk",
        group: "python-sdk",
    },
    LanguagePolicy {
        id: "typescript",
        display_name: "TypeScript",
        generator: "fernapi/fern-typescript-node-sdk",
        generator_version: "0.42.6",
        registry: PackageRegistry::Npm,
        package_name_pattern: "{namespace}-sdk",
        group: "ts-sdk",
    },
];

/// Look up a language's policy by exact (normalized) identifier
pub fn lookup(language: &LanguageId) -> Option<&'static LanguagePolicy> {
    POLICIES.iter().find(|policy| policy.id == language.as_str())
}

/// Supported language identifiers in table order
pub fn supported_languages() -> Vec<LanguageId> {
    POLICIES.iter().map(|policy| LanguageId::new(policy.id)).collect()
}
