//! Builds the shared configuration artifact from the language policy table

use chrono::{DateTime, Utc};

use crate::generation::LanguageId;
use crate::sdk_config::{
    ConfigArtifact, ConfigError, LanguageSettings,
    naming::{normalize_company_name, organization_id},
    policy,
};
use crate::spec::ValidatedSpec;

/// Config repository builder
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    /// Account that will own the repositories, when known up front
    owner: Option<String>,
}

impl ConfigBuilder {
    pub fn new(owner: Option<String>) -> Self {
        Self {
            owner: owner.filter(|owner| !owner.trim().is_empty()),
        }
    }

    pub fn build(
        &self,
        company_name: &str,
        spec: &ValidatedSpec,
        languages: &[LanguageId],
    ) -> Result<ConfigArtifact, ConfigError> {
        self.build_at(company_name, spec, languages, Utc::now())
    }

    /// Build with an explicit timestamp
    pub fn build_at(
        &self,
        company_name: &str,
        spec: &ValidatedSpec,
        languages: &[LanguageId],
        generated_at: DateTime<Utc>,
    ) -> Result<ConfigArtifact, ConfigError> {
        let unsupported: Vec<LanguageId> = languages
            .iter()
            .filter(|language| policy::lookup(language).is_none())
            .cloned()
            .collect();
        if !unsupported.is_empty() {
            return Err(ConfigError::UnsupportedLanguage {
                languages: unsupported,
                supported: policy::supported_languages(),
            });
        }

        let company_name = company_name.trim();
        let namespace = normalize_company_name(company_name);
        if namespace.is_empty() {
            return Err(ConfigError::InvalidCompanyName(company_name.to_string()));
        }

        let languages = languages
            .iter()
            .filter_map(|language| policy::lookup(language).map(|policy| (language, policy)))
            .map(|(language, policy)| {
                let repository = format!("{namespace}-{}-sdk", language.as_str());
                LanguageSettings {
                    language: language.clone(),
                    display_name: policy.display_name.to_string(),
                    company_name: company_name.to_string(),
                    namespace: namespace.clone(),
                    package_name: policy.package_name(&namespace),
                    package_name_key: policy.registry.package_name_key().to_string(),
                    registry: policy.registry,
                    repository_path: self.repository_path(&repository),
                    repository,
                    group: policy.group.to_string(),
                    generator: policy.generator.to_string(),
                    generator_version: policy.generator_version.to_string(),
                    package_version: spec.info.version.clone(),
                }
            })
            .collect();

        tracing::debug!(
            namespace = %namespace,
            fingerprint = spec.fingerprint.short(),
            "Config artifact built"
        );

        Ok(ConfigArtifact {
            company_name: company_name.to_string(),
            organization: organization_id(&namespace, &spec.fingerprint),
            namespace,
            generated_at,
            fingerprint: spec.fingerprint.clone(),
            api_title: spec.info.title.clone(),
            api_version: spec.info.version.clone(),
            spec_format: spec.format,
            spec_document: spec.raw.clone(),
            languages,
        })
    }

    fn repository_path(&self, repository: &str) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}/{repository}"),
            None => repository.to_string(),
        }
    }
}
