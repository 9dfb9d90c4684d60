//! Publisher implementations

pub mod filesystem;
pub mod github;
pub mod memory;

pub use filesystem::FileSystemPublisher;
pub use github::{GitHubPublisher, GitHubPublisherConfig, GitHubToken};
pub use memory::InMemoryPublisher;

use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::publish::{PublishError, Publisher};
use crate::settings::{PublisherKind, PublisherSettings};

/// Build the publisher selected in settings
pub fn build_publisher(
    settings: &PublisherSettings,
) -> Result<Arc<dyn Publisher>, PublishError> {
    match settings.kind {
        PublisherKind::GitHub => {
            let github = &settings.github;
            let api_url = Url::parse(&github.api_url).map_err(|e| {
                let message = format!("invalid API URL {}: {e}", github.api_url);
                PublishError::permanent("github", message)
            })?;
            let token = github.token.clone().ok_or_else(|| {
                PublishError::permanent("github", "a GitHub access token is required")
            })?;
            let publisher = GitHubPublisher::new(GitHubPublisherConfig {
                api_url,
                owner: github.owner.clone(),
                token,
                private: github.private,
                timeout: Duration::from_secs(github.timeout_secs),
            })?;
            Ok(Arc::new(publisher))
        }
        PublisherKind::Filesystem => Ok(Arc::new(FileSystemPublisher::new(
            settings.filesystem.root.clone(),
        ))),
        PublisherKind::Memory => Ok(Arc::new(InMemoryPublisher::new())),
    }
}
