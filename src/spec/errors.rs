//! Error types for spec validation

use thiserror::Error;

/// Reasons a submitted specification is rejected before any generation work
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// The document is empty or not well-formed YAML/JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// The document parsed but does not describe a usable API
    #[error("Semantic error: {0}")]
    Semantic(String),
}

impl SpecError {
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }

    pub fn semantic<S: Into<String>>(msg: S) -> Self {
        Self::Semantic(msg.into())
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            SpecError::Parse(_) => "parse",
            SpecError::Semantic(_) => "semantic",
        }
    }
}
