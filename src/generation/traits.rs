//! Port interfaces for the generation domain

use crate::generation::{GeneratedProject, GenerationError, LanguageId};
use crate::sdk_config::LanguageSettings;
use crate::spec::ValidatedSpec;
use async_trait::async_trait;

/// Turns a validated specification into a buildable SDK project for one language.
///
/// Implementations hold no mutable state, so one instance can serve any
/// number of concurrent generations.
#[async_trait]
pub trait LanguageGenerator: Send + Sync {
    /// Language this generator produces
    fn language(&self) -> LanguageId;

    /// Generate a project from the spec using the language's settings
    async fn generate(
        &self,
        spec: &ValidatedSpec,
        settings: &LanguageSettings,
    ) -> Result<GeneratedProject, GenerationError>;
}
