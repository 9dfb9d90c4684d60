//! Error types for publishing

use thiserror::Error;

/// A publish attempt failed.
///
/// Transient failures are worth retrying; permanent ones are recorded
/// immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// Network errors, timeouts, 401/403, 429 and 5xx responses
    #[error("Transient publish failure for {destination}: {message}")]
    Transient { destination: String, message: String },

    /// Invalid destinations, missing owners and other client errors
    #[error("Permanent publish failure for {destination}: {message}")]
    Permanent { destination: String, message: String },
}

impl PublishError {
    pub fn transient(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            destination: destination.into(),
            message: message.into(),
        }
    }

    pub fn permanent(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Permanent {
            destination: destination.into(),
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, PublishError::Transient { .. })
    }
}
