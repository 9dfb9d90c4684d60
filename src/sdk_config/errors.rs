//! Error types for config repository building

use thiserror::Error;

use crate::generation::LanguageId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Lists every offending id, not just the first
    #[error("Unsupported language(s): {}; supported: {}", join(.languages), join(.supported))]
    UnsupportedLanguage {
        languages: Vec<LanguageId>,
        supported: Vec<LanguageId>,
    },

    #[error("Company name `{0}` contains no usable characters")]
    InvalidCompanyName(String),

    #[error("Failed to render config file: {0}")]
    Render(String),
}

impl ConfigError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::UnsupportedLanguage { .. } => "unsupported_language",
            ConfigError::InvalidCompanyName(_) => "invalid_request",
            ConfigError::Render(_) => "internal",
        }
    }
}

fn join(languages: &[LanguageId]) -> String {
    languages
        .iter()
        .map(LanguageId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
