//! Filesystem-based publisher
//!
//! Each destination is a directory `<root>/<repo-name>/`. Files are written
//! into a staging directory first and swapped in with a rename, so a
//! destination holds either the previous or the new file set, never a mix.

use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::generation::Artifact;
use crate::publish::{DestinationKey, PublishArtifact, PublishError, Publisher, RepoLocation};

/// Publisher that writes artifacts below a root directory
#[derive(Debug, Clone)]
pub struct FileSystemPublisher {
    root: PathBuf,
}

impl FileSystemPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write_artifacts(
        &self,
        dir: &Path,
        artifact: &PublishArtifact,
        repo_name: &str,
    ) -> Result<(), PublishError> {
        for file in &artifact.files {
            let path = dir.join(checked_relative(file, repo_name)?);

            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_error(repo_name, "create directory", parent, e))?;
            }

            let mut handle = fs::File::create(&path)
                .await
                .map_err(|e| io_error(repo_name, "create file", &path, e))?;
            handle
                .write_all(file.content.as_bytes())
                .await
                .map_err(|e| io_error(repo_name, "write file", &path, e))?;
            handle
                .flush()
                .await
                .map_err(|e| io_error(repo_name, "flush file", &path, e))?;
        }

        let description = dir.join(".description");
        fs::write(&description, format!("{}\n", artifact.description))
            .await
            .map_err(|e| io_error(repo_name, "write file", &description, e))
    }
}

#[async_trait]
impl Publisher for FileSystemPublisher {
    async fn publish(
        &self,
        artifact: &PublishArtifact,
        destination: &DestinationKey,
    ) -> Result<RepoLocation, PublishError> {
        let repo_name = destination.validate()?;
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error(&repo_name, "create directory", &self.root, e))?;

        let staging = tempfile::Builder::new()
            .prefix(&format!(".{repo_name}.staging-"))
            .tempdir_in(&self.root)
            .map_err(|e| io_error(&repo_name, "create staging directory in", &self.root, e))?;
        self.write_artifacts(staging.path(), artifact, &repo_name)
            .await?;

        let target = self.root.join(&repo_name);
        if fs::try_exists(&target).await.unwrap_or(false) {
            let retired = tempfile::Builder::new()
                .prefix(&format!(".{repo_name}.retired-"))
                .tempdir_in(&self.root)
                .map_err(|e| io_error(&repo_name, "create directory in", &self.root, e))?;
            let retired_path = retired.path().join("previous");
            fs::rename(&target, &retired_path)
                .await
                .map_err(|e| io_error(&repo_name, "move aside", &target, e))?;
            // `retired` removes the previous file set when dropped
        }
        fs::rename(staging.path(), &target)
            .await
            .map_err(|e| io_error(&repo_name, "move into place", &target, e))?;

        let absolute = fs::canonicalize(&target)
            .await
            .map_err(|e| io_error(&repo_name, "resolve", &target, e))?;
        let url = Url::from_directory_path(&absolute).map_err(|_| {
            let message = format!("{} is not a valid location", absolute.display());
            PublishError::permanent(&repo_name, message)
        })?;

        tracing::info!(
            repo = %repo_name,
            path = %absolute.display(),
            files = artifact.files.len(),
            "Published to filesystem"
        );
        Ok(RepoLocation::new(url))
    }
}

/// Artifact paths must stay inside the destination directory
fn checked_relative<'a>(file: &'a Artifact, repo_name: &str) -> Result<&'a Path, PublishError> {
    let escapes = file.path.components().any(|component| {
        !matches!(component, Component::Normal(_) | Component::CurDir)
    });
    if escapes || file.path.as_os_str().is_empty() {
        return Err(PublishError::permanent(
            repo_name,
            format!("artifact path {} is not a relative path", file.path.display()),
        ));
    }
    Ok(&file.path)
}

fn io_error(repo_name: &str, action: &str, path: &Path, error: io::Error) -> PublishError {
    let message = format!("Failed to {action} {}: {error}", path.display());
    match error.kind() {
        io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            PublishError::transient(repo_name, message)
        }
        _ => PublishError::permanent(repo_name, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::LanguageId;
    use tempfile::TempDir;

    fn artifact(description: &str, files: &[(&str, &str)]) -> PublishArtifact {
        PublishArtifact::new(
            description,
            files
                .iter()
                .map(|(path, content)| Artifact::new(*path, *content))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_publish_writes_file_tree() {
        let root = TempDir::new().unwrap();
        let publisher = FileSystemPublisher::new(root.path());
        let key = DestinationKey::sdk("acme", LanguageId::new("python"));

        let location = publisher
            .publish(
                &artifact("Python SDK", &[("README.md", "# Acme"), ("acme_sdk/__init__.py", "")]),
                &key,
            )
            .await
            .unwrap();

        assert_eq!(location.url().scheme(), "file");
        assert!(location.as_str().ends_with("/acme-python-sdk/"));
        let dir = root.path().join("acme-python-sdk");
        assert_eq!(std::fs::read_to_string(dir.join("README.md")).unwrap(), "# Acme");
        assert!(dir.join("acme_sdk/__init__.py").exists());
    }

    #[tokio::test]
    async fn test_republish_replaces_previous_files() {
        let root = TempDir::new().unwrap();
        let publisher = FileSystemPublisher::new(root.path());
        let key = DestinationKey::config("acme");

        let first = publisher
            .publish(&artifact("v1", &[("old.txt", "1"), ("keep.txt", "1")]), &key)
            .await
            .unwrap();
        let second = publisher
            .publish(&artifact("v2", &[("keep.txt", "2")]), &key)
            .await
            .unwrap();

        assert_eq!(first, second);
        let dir = root.path().join("acme-config");
        assert!(!dir.join("old.txt").exists());
        assert_eq!(std::fs::read_to_string(dir.join("keep.txt")).unwrap(), "2");

        // No staging or retired directories left behind
        let entries: Vec<_> = std::fs::read_dir(root.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("acme-config")]);
    }

    #[tokio::test]
    async fn test_escaping_paths_are_rejected() {
        let root = TempDir::new().unwrap();
        let publisher = FileSystemPublisher::new(root.path());

        let error = publisher
            .publish(&artifact("x", &[("../escape.txt", "")]), &DestinationKey::config("acme"))
            .await
            .unwrap_err();

        assert!(!error.is_transient());
        assert!(!root.path().join("acme-config").exists());
        assert!(!root.path().parent().unwrap().join("escape.txt").exists());
    }
}
