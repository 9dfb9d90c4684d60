//! Error types for the generation domain

use crate::generation::LanguageId;
use thiserror::Error;

/// A language generator could not produce a project.
///
/// Always scoped to one language; the orchestrator records it in that
/// language's result and keeps going with the others.
#[derive(Error, Debug)]
#[error("{language} generation failed: {cause}")]
pub struct GenerationError {
    pub language: LanguageId,
    pub cause: GenerationCause,
}

/// Underlying reason a generation failed
#[derive(Error, Debug)]
pub enum GenerationCause {
    #[error("unsupported construct at {location}: {reason}")]
    UnsupportedConstruct { location: String, reason: String },

    #[error("no generator registered")]
    NoGenerator,

    #[error("render error: {0}")]
    Render(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl GenerationError {
    pub fn new(language: LanguageId, cause: GenerationCause) -> Self {
        Self { language, cause }
    }

    pub fn unsupported(
        language: LanguageId,
        location: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            language,
            GenerationCause::UnsupportedConstruct {
                location: location.into(),
                reason: reason.into(),
            },
        )
    }

    pub fn render<E: std::fmt::Display>(language: LanguageId, error: E) -> Self {
        Self::new(language, GenerationCause::Render(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_message_names_language_and_location() {
        let error = GenerationError::unsupported(
            LanguageId::new("typescript"),
            "#/components/schemas/Pet",
            "`not` schemas have no TypeScript equivalent",
        );

        let message = error.to_string();
        assert!(message.starts_with("typescript generation failed"));
        assert!(message.contains("#/components/schemas/Pet"));
    }

    #[test]
    fn test_render_error_wraps_display() {
        let error = GenerationError::render(LanguageId::new("python"), "bad template");
        assert!(matches!(error.cause, GenerationCause::Render(ref m) if m == "bad template"));
    }
}
