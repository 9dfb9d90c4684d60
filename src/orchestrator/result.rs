//! Terminal outcomes of a setup run

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::generation::{GenerationError, LanguageId};
use crate::publish::{PublishError, RepoLocation};
use crate::sdk_config::ConfigError;
use crate::spec::{SpecError, SpecFingerprint};

/// Machine-readable failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    Semantic,
    UnsupportedLanguage,
    InvalidRequest,
    Generation,
    Publish,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Semantic => "semantic",
            ErrorKind::UnsupportedLanguage => "unsupported_language",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Generation => "generation",
            ErrorKind::Publish => "publish",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category plus human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "request was cancelled before publishing")
    }
}

impl From<&GenerationError> for ErrorDetail {
    fn from(error: &GenerationError) -> Self {
        Self::new(ErrorKind::Generation, error.to_string())
    }
}

impl From<&PublishError> for ErrorDetail {
    fn from(error: &PublishError) -> Self {
        Self::new(ErrorKind::Publish, error.to_string())
    }
}

/// Terminal outcome for one language; never pending
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Succeeded { location: RepoLocation },
    Failed { error: ErrorDetail },
}

impl GenerationResult {
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failed {
            error: ErrorDetail::new(kind, message),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Succeeded { .. })
    }

    pub fn location(&self) -> Option<&RepoLocation> {
        match self {
            GenerationResult::Succeeded { location } => Some(location),
            GenerationResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorDetail> {
        match self {
            GenerationResult::Succeeded { .. } => None,
            GenerationResult::Failed { error } => Some(error),
        }
    }
}

/// Overall status of a completed setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupStatus {
    /// Every language succeeded
    Success,
    /// Some languages failed
    Partial,
    /// Every language failed; the config repository still stands
    Failed,
}

/// Result of a completed setup run
#[derive(Debug, Clone)]
pub struct SetupResult {
    pub request_id: Uuid,
    pub fingerprint: SpecFingerprint,
    pub config: RepoLocation,
    /// One entry per requested language, in request order
    pub languages: Vec<(LanguageId, GenerationResult)>,
}

impl SetupResult {
    pub fn status(&self) -> SetupStatus {
        let succeeded = self
            .languages
            .iter()
            .filter(|(_, result)| result.is_success())
            .count();
        if succeeded == self.languages.len() {
            SetupStatus::Success
        } else if succeeded == 0 {
            SetupStatus::Failed
        } else {
            SetupStatus::Partial
        }
    }

    pub fn get(&self, language: &LanguageId) -> Option<&GenerationResult> {
        self.languages
            .iter()
            .find(|(id, _)| id == language)
            .map(|(_, result)| result)
    }
}

/// The request was refused and nothing beyond what `kind` implies was published.
///
/// Validation, language and request-shape rejections happen before any
/// publish; a `publish` rejection means the config repository could not be
/// published, so no SDK work started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SetupRejection {
    pub kind: ErrorKind,
    pub message: String,
}

impl SetupRejection {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail::new(self.kind, self.message.clone())
    }
}

impl From<SpecError> for SetupRejection {
    fn from(error: SpecError) -> Self {
        let kind = match error {
            SpecError::Parse(_) => ErrorKind::Parse,
            SpecError::Semantic(_) => ErrorKind::Semantic,
        };
        Self::new(kind, error.to_string())
    }
}

impl From<ConfigError> for SetupRejection {
    fn from(error: ConfigError) -> Self {
        let kind = match error {
            ConfigError::UnsupportedLanguage { .. } => ErrorKind::UnsupportedLanguage,
            ConfigError::InvalidCompanyName(_) => ErrorKind::InvalidRequest,
            ConfigError::Render(_) => ErrorKind::Internal,
        };
        Self::new(kind, error.to_string())
    }
}
