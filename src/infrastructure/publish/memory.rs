//! In-memory publisher for tests and dry runs

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use url::Url;

use crate::publish::{DestinationKey, PublishArtifact, PublishError, Publisher, RepoLocation};

/// Publisher that keeps artifacts in a map keyed by repository name
#[derive(Debug, Default)]
pub struct InMemoryPublisher {
    repositories: Mutex<BTreeMap<String, PublishArtifact>>,
    publish_count: Mutex<usize>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest artifact published under a repository name
    pub fn get(&self, repo_name: &str) -> Option<PublishArtifact> {
        self.repositories
            .lock()
            .ok()
            .and_then(|repositories| repositories.get(repo_name).cloned())
    }

    /// Repository names currently held
    pub fn repo_names(&self) -> Vec<String> {
        self.repositories
            .lock()
            .map(|repositories| repositories.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of successful publish calls, including overwrites
    pub fn publish_count(&self) -> usize {
        self.publish_count.lock().map(|count| *count).unwrap_or_default()
    }

    pub(crate) fn location(repo_name: &str) -> Result<RepoLocation, PublishError> {
        Url::parse(&format!("memory://repos/{repo_name}"))
            .map(RepoLocation::new)
            .map_err(|e| PublishError::permanent(repo_name, e.to_string()))
    }
}

#[async_trait]
impl Publisher for InMemoryPublisher {
    async fn publish(
        &self,
        artifact: &PublishArtifact,
        destination: &DestinationKey,
    ) -> Result<RepoLocation, PublishError> {
        let repo_name = destination.validate()?;
        let location = Self::location(&repo_name)?;

        let mut repositories = self
            .repositories
            .lock()
            .map_err(|_| PublishError::permanent(&repo_name, "in-memory store poisoned"))?;
        repositories.insert(repo_name.clone(), artifact.clone());
        drop(repositories);

        if let Ok(mut count) = self.publish_count.lock() {
            *count += 1;
        }

        tracing::debug!(
            repo = %repo_name,
            files = artifact.files.len(),
            "Stored artifact in memory"
        );
        Ok(location)
    }
}
