//! The shared configuration artifact and its rendered file set

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::generation::{Artifact, LanguageId, RenderContext};
use crate::infrastructure::generation::{TemplateFile, TeraTemplateRenderer};
use crate::sdk_config::{ConfigError, PackageRegistry, policy::GENERATOR_CLI_VERSION};
use crate::spec::{SpecFingerprint, SpecFormat};

const CONFIG_TEMPLATES: &[TemplateFile] = &[
    TemplateFile::new(
        "fern/generators.yml",
        include_str!("../../templates/config/generators.yml"),
    ),
    TemplateFile::new("README.md", include_str!("../../templates/config/README.md")),
];

/// Settings one language generator runs with, taken from the config artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageSettings {
    pub language: LanguageId,
    pub display_name: String,
    pub company_name: String,
    pub namespace: String,
    pub package_name: String,
    pub package_name_key: String,
    pub registry: PackageRegistry,
    /// Repository name, e.g. `acme-python-sdk`
    pub repository: String,
    /// `owner/name` when the owner is known, otherwise the bare name
    pub repository_path: String,
    pub group: String,
    pub generator: String,
    pub generator_version: String,
    /// Version given to the generated package, taken from `info.version`
    pub package_version: String,
}

impl LanguageSettings {
    /// Repository description, e.g. "Python SDK for Acme API"
    pub fn description(&self) -> String {
        format!("{} SDK for {} API", self.display_name, self.company_name)
    }
}

/// Shared configuration for all SDKs of one company.
///
/// Read-only once built; every per-language task reads its settings from here.
#[derive(Debug, Clone)]
pub struct ConfigArtifact {
    pub company_name: String,
    pub namespace: String,
    pub organization: String,
    /// Metadata only, never rendered into files
    pub generated_at: DateTime<Utc>,
    pub fingerprint: SpecFingerprint,
    pub api_title: String,
    pub api_version: String,
    pub spec_format: SpecFormat,
    pub(crate) spec_document: String,
    pub(crate) languages: Vec<LanguageSettings>,
}

impl ConfigArtifact {
    /// Settings for one language, if it was requested
    pub fn settings_for(&self, language: &LanguageId) -> Option<&LanguageSettings> {
        self.languages
            .iter()
            .find(|settings| &settings.language == language)
    }

    /// Per-language settings in request order
    pub fn languages(&self) -> &[LanguageSettings] {
        &self.languages
    }

    /// Name of the API definition file inside `fern/`
    pub fn spec_file_name(&self) -> String {
        format!("openapi.{}", self.spec_format.file_extension())
    }

    /// Repository description
    pub fn description(&self) -> String {
        format!("SDK configuration for {}", self.company_name)
    }

    /// Render the config repository's files.
    ///
    /// Output depends only on the build inputs, never on `generated_at`.
    pub fn render_files(&self) -> Result<Vec<Artifact>, ConfigError> {
        let mut context = RenderContext::new();
        context.add_variable("company_name", json!(self.company_name));
        context.add_variable("organization", json!(self.organization));
        context.add_variable("api_title", json!(self.api_title));
        context.add_variable("api_version", json!(self.api_version));
        context.add_variable("spec_file", json!(self.spec_file_name()));
        context.add_variable("fingerprint", json!(self.fingerprint));
        context.add_variable("languages", json!(self.languages));

        let mut files = TeraTemplateRenderer::new()
            .render(CONFIG_TEMPLATES, &context)
            .map_err(ConfigError::Render)?;

        let fern_config = serde_json::to_string_pretty(&json!({
            "organization": self.organization,
            "version": GENERATOR_CLI_VERSION,
        }))
        .map_err(|e| ConfigError::Render(e.to_string()))?;

        files.push(Artifact::new("fern/fern.config.json", fern_config + "\n"));
        files.push(Artifact::new(
            format!("fern/{}", self.spec_file_name()),
            format!("{}\n", self.spec_document),
        ));
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}
