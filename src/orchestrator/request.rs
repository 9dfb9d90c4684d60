//! Incoming setup request

use uuid::Uuid;

use crate::generation::LanguageId;
use crate::orchestrator::{ErrorKind, SetupRejection};

/// One request to build the config repository and the SDKs for a company
#[derive(Debug, Clone)]
pub struct SetupRequest {
    pub request_id: Uuid,
    pub company_name: String,
    /// Raw YAML or JSON text as uploaded; untrusted
    pub spec_document: String,
    /// File extension or file name of the upload
    pub format_hint: Option<String>,
    /// Deduplicated, in first-occurrence order
    pub languages: Vec<LanguageId>,
}

impl SetupRequest {
    /// Check required fields and collapse duplicate languages.
    ///
    /// The spec document is not inspected here; empty or malformed documents
    /// are rejected by validation with a parse error.
    pub fn new<I, S>(
        company_name: impl Into<String>,
        spec_document: impl Into<String>,
        languages: I,
    ) -> Result<Self, SetupRejection>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let company_name = company_name.into().trim().to_string();
        if company_name.is_empty() {
            return Err(SetupRejection::new(
                ErrorKind::InvalidRequest,
                "company_name is required",
            ));
        }

        let mut deduplicated: Vec<LanguageId> = Vec::new();
        for language in languages.into_iter().map(LanguageId::new) {
            if language.is_empty() {
                return Err(SetupRejection::new(
                    ErrorKind::InvalidRequest,
                    "language identifiers must not be empty",
                ));
            }
            if !deduplicated.contains(&language) {
                deduplicated.push(language);
            }
        }
        if deduplicated.is_empty() {
            return Err(SetupRejection::new(
                ErrorKind::InvalidRequest,
                "at least one language is required",
            ));
        }

        Ok(Self {
            request_id: Uuid::new_v4(),
            company_name,
            spec_document: spec_document.into(),
            format_hint: None,
            languages: deduplicated,
        })
    }

    pub fn with_format_hint(mut self, hint: Option<String>) -> Self {
        self.format_hint = hint.filter(|hint| !hint.trim().is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_languages_deduplicated_in_order() {
        let languages = ["TypeScript", "python", " typescript ", "PYTHON"];
        let request = SetupRequest::new("Acme", "openapi: 3.0.0", languages).unwrap();
        let ids: Vec<_> = request.languages.iter().map(LanguageId::as_str).collect();
        assert_eq!(ids, vec!["typescript", "python"]);
    }

    #[test]
    fn test_company_name_required() {
        let error = SetupRequest::new("   ", "", ["python"]).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_languages_required() {
        let error = SetupRequest::new("Acme", "", Vec::<String>::new()).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidRequest);

        let error = SetupRequest::new("Acme", "", ["python", " "]).unwrap_err();
        assert!(error.message.contains("must not be empty"));
    }

    #[test]
    fn test_blank_format_hint_is_dropped() {
        let request = SetupRequest::new("Acme", "", ["python"])
            .unwrap()
            .with_format_hint(Some("  ".to_string()));
        assert!(request.format_hint.is_none());
    }
}
