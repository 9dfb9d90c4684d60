//! GitHub REST API publisher
//!
//! Each destination key maps to one repository under the configured owner.
//! The repository is created on first publish and files are upserted through
//! the contents API, so publishing the same key again converges on the same
//! repository instead of creating another one. Files absent from the new
//! artifact are deleted, leaving the repository with exactly the published
//! file set.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;
use zeroize::Zeroize;

use crate::generation::Artifact;
use crate::publish::{DestinationKey, PublishArtifact, PublishError, Publisher, RepoLocation};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("sdkforge/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Personal access token, wiped from memory on drop
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct GitHubToken {
    value: String,
}

impl GitHubToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl From<String> for GitHubToken {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for GitHubToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GitHubToken(***)")
    }
}

impl Zeroize for GitHubToken {
    fn zeroize(&mut self) {
        self.value.zeroize();
    }
}

impl Drop for GitHubToken {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

/// Connection settings for [`GitHubPublisher`]
#[derive(Debug, Clone)]
pub struct GitHubPublisherConfig {
    pub api_url: Url,
    /// User or organization owning the repositories; the token's user when unset
    pub owner: Option<String>,
    pub token: GitHubToken,
    pub private: bool,
    pub timeout: Duration,
}

/// Where new repositories are created
#[derive(Debug, Clone, PartialEq, Eq)]
enum Owner {
    User(String),
    Organization(String),
}

impl Owner {
    fn login(&self) -> &str {
        match self {
            Owner::User(login) | Owner::Organization(login) => login,
        }
    }
}

/// GitHub API response for the authenticated user.
#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

/// GitHub API response for a repository.
#[derive(Debug, Deserialize)]
struct GitHubRepository {
    html_url: String,
    #[serde(default)]
    default_branch: Option<String>,
}

/// GitHub API response for a recursive git tree listing.
#[derive(Debug, Deserialize)]
struct GitHubTree {
    #[serde(default)]
    tree: Vec<GitHubTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct GitHubTreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

/// GitHub API response for a file in the contents API.
#[derive(Debug, Deserialize)]
struct GitHubContent {
    sha: String,
    #[serde(default)]
    content: Option<String>,
}

/// GitHub API error response.
#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
}

#[derive(Debug, Serialize)]
struct CreateRepository<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Debug, Serialize)]
struct DeleteContent<'a> {
    message: String,
    sha: &'a str,
}

#[derive(Debug, Serialize)]
struct PutContent<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Publisher backed by GitHub repositories
pub struct GitHubPublisher {
    client: Client,
    config: GitHubPublisherConfig,
    owner: OnceCell<Owner>,
}

impl fmt::Debug for GitHubPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubPublisher")
            .field("api_url", &self.config.api_url.as_str())
            .field("owner", &self.config.owner)
            .field("private", &self.config.private)
            .finish()
    }
}

impl GitHubPublisher {
    pub fn new(config: GitHubPublisherConfig) -> Result<Self, PublishError> {
        if config.token.is_empty() {
            return Err(PublishError::permanent(
                "github",
                "a GitHub access token is required",
            ));
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PublishError::permanent("github", format!("HTTP client setup failed: {e}"))
            })?;

        Ok(Self {
            client,
            config,
            owner: OnceCell::new(),
        })
    }

    fn endpoint(&self, repo_name: &str, segments: &[&str]) -> Result<Url, PublishError> {
        let mut url = self.config.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                let message = format!("{} cannot be a base URL", self.config.api_url);
                PublishError::permanent(repo_name, message)
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(self.config.token.expose())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Owner is resolved once per publisher
    async fn owner(&self, repo_name: &str) -> Result<&Owner, PublishError> {
        self.owner.get_or_try_init(|| self.resolve_owner(repo_name)).await
    }

    /// The authenticated login decides whether a configured owner is the
    /// user itself or an organization.
    async fn resolve_owner(&self, repo_name: &str) -> Result<Owner, PublishError> {
        let url = self.endpoint(repo_name, &["user"])?;
        let response = send(repo_name, self.request(Method::GET, url)).await?;
        let response = ensure_success(repo_name, response).await?;
        let user: GitHubUser = read_json(repo_name, response).await?;

        let owner = match &self.config.owner {
            Some(owner) if !owner.eq_ignore_ascii_case(&user.login) => {
                Owner::Organization(owner.clone())
            }
            _ => Owner::User(user.login),
        };
        tracing::debug!(owner = owner.login(), "Resolved GitHub owner");
        Ok(owner)
    }

    async fn find_repository(
        &self,
        owner: &Owner,
        repo_name: &str,
    ) -> Result<Option<GitHubRepository>, PublishError> {
        let url = self.endpoint(repo_name, &["repos", owner.login(), repo_name])?;
        let response = send(repo_name, self.request(Method::GET, url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(repo_name, response).await?;
        read_json(repo_name, response).await.map(Some)
    }

    async fn ensure_repository(
        &self,
        owner: &Owner,
        repo_name: &str,
        description: &str,
    ) -> Result<GitHubRepository, PublishError> {
        if let Some(repository) = self.find_repository(owner, repo_name).await? {
            return Ok(repository);
        }

        let url = match owner {
            Owner::User(_) => self.endpoint(repo_name, &["user", "repos"])?,
            Owner::Organization(org) => self.endpoint(repo_name, &["orgs", org.as_str(), "repos"])?,
        };
        let body = CreateRepository {
            name: repo_name,
            description,
            private: self.config.private,
            auto_init: true,
        };
        let response = send(repo_name, self.request(Method::POST, url).json(&body)).await?;

        // 422: the name already exists, typically a concurrent create
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            tracing::debug!(repo = %repo_name, "Repository already exists, reusing it");
            return self.find_repository(owner, repo_name).await?.ok_or_else(|| {
                PublishError::permanent(repo_name, "repository creation was rejected")
            });
        }

        let response = ensure_success(repo_name, response).await?;
        tracing::info!(repo = %repo_name, owner = owner.login(), "Created GitHub repository");
        read_json(repo_name, response).await
    }

    fn contents_url(
        &self,
        owner: &Owner,
        repo_name: &str,
        relative: &str,
    ) -> Result<Url, PublishError> {
        let mut segments = vec!["repos", owner.login(), repo_name, "contents"];
        segments.extend(relative.split('/').filter(|segment| !segment.is_empty()));
        self.endpoint(repo_name, &segments)
    }

    async fn upsert_file(
        &self,
        owner: &Owner,
        repo_name: &str,
        file: &Artifact,
    ) -> Result<(), PublishError> {
        let relative = relative_path(repo_name, file)?;
        let url = self.contents_url(owner, repo_name, &relative)?;

        let response = send(repo_name, self.request(Method::GET, url.clone())).await?;
        let existing = if response.status() == StatusCode::NOT_FOUND {
            None
        } else {
            let response = ensure_success(repo_name, response).await?;
            Some(read_json::<GitHubContent>(repo_name, response).await?)
        };

        if existing.as_ref().and_then(decoded_content).as_deref() == Some(file.content.as_bytes()) {
            tracing::debug!(repo = %repo_name, path = %file.path.display(), "File unchanged");
            return Ok(());
        }

        let body = PutContent {
            message: format!("Update {}", file.path.display()),
            content: STANDARD.encode(file.content.as_bytes()),
            sha: existing.as_ref().map(|content| content.sha.as_str()),
        };
        let response = send(repo_name, self.request(Method::PUT, url).json(&body)).await?;
        ensure_success(repo_name, response).await?;
        Ok(())
    }

    /// Blob paths and shas on the default branch; empty for a repository
    /// without commits
    async fn list_blobs(
        &self,
        owner: &Owner,
        repo_name: &str,
        repository: &GitHubRepository,
    ) -> Result<Vec<GitHubTreeEntry>, PublishError> {
        let branch = repository.default_branch.as_deref().unwrap_or("HEAD");
        let mut url =
            self.endpoint(repo_name, &["repos", owner.login(), repo_name, "git", "trees", branch])?;
        url.query_pairs_mut().append_pair("recursive", "1");

        let response = send(repo_name, self.request(Method::GET, url)).await?;
        // 409: the repository is empty
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::CONFLICT) {
            return Ok(Vec::new());
        }
        let response = ensure_success(repo_name, response).await?;
        let tree: GitHubTree = read_json(repo_name, response).await?;
        if tree.truncated {
            tracing::warn!(repo = %repo_name, "Tree listing truncated, stale files may remain");
        }
        Ok(tree.tree.into_iter().filter(|entry| entry.kind == "blob").collect())
    }

    /// Delete every blob that is not part of `artifact`
    async fn prune_stale_files(
        &self,
        owner: &Owner,
        repo_name: &str,
        repository: &GitHubRepository,
        artifact: &PublishArtifact,
    ) -> Result<(), PublishError> {
        let published = artifact
            .files
            .iter()
            .map(|file| relative_path(repo_name, file))
            .collect::<Result<HashSet<_>, _>>()?;

        for entry in self.list_blobs(owner, repo_name, repository).await? {
            if published.contains(&entry.path) {
                continue;
            }
            let url = self.contents_url(owner, repo_name, &entry.path)?;
            let body = DeleteContent {
                message: format!("Remove {}", entry.path),
                sha: &entry.sha,
            };
            let response = send(repo_name, self.request(Method::DELETE, url).json(&body)).await?;
            if response.status() == StatusCode::NOT_FOUND {
                continue;
            }
            ensure_success(repo_name, response).await?;
            tracing::debug!(repo = %repo_name, path = %entry.path, "Removed stale file");
        }
        Ok(())
    }
}

#[async_trait]
impl Publisher for GitHubPublisher {
    async fn publish(
        &self,
        artifact: &PublishArtifact,
        destination: &DestinationKey,
    ) -> Result<RepoLocation, PublishError> {
        let repo_name = destination.validate()?;
        let owner = self.owner(&repo_name).await?;
        let repository = self
            .ensure_repository(owner, &repo_name, &artifact.description)
            .await?;

        for file in &artifact.files {
            self.upsert_file(owner, &repo_name, file).await?;
        }
        self.prune_stale_files(owner, &repo_name, &repository, artifact).await?;

        let url = Url::parse(&repository.html_url).map_err(|e| {
            let message = format!("invalid repository URL {}: {e}", repository.html_url);
            PublishError::permanent(&repo_name, message)
        })?;
        tracing::info!(
            repo = %repo_name,
            url = %url,
            files = artifact.files.len(),
            "Published to GitHub"
        );
        Ok(RepoLocation::new(url))
    }
}

/// Repository path of an artifact, `/`-separated
fn relative_path(repo_name: &str, file: &Artifact) -> Result<String, PublishError> {
    let segments = file
        .path
        .iter()
        .map(|segment| {
            segment.to_str().ok_or_else(|| {
                let message = format!("{} is not valid UTF-8", file.path.display());
                PublishError::permanent(repo_name, message)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("/"))
}

/// Contents API payloads are base64 wrapped at 60 columns
fn decoded_content(content: &GitHubContent) -> Option<Vec<u8>> {
    let encoded: String = content
        .content
        .as_deref()?
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(encoded).ok()
}

async fn send(repo_name: &str, request: RequestBuilder) -> Result<Response, PublishError> {
    request.send().await.map_err(|e| {
        // Network failures and timeouts
        PublishError::transient(repo_name, format!("GitHub request failed: {e}"))
    })
}

async fn read_json<T: serde::de::DeserializeOwned>(
    repo_name: &str,
    response: Response,
) -> Result<T, PublishError> {
    response.json().await.map_err(|e| {
        if e.is_decode() {
            PublishError::permanent(repo_name, format!("unexpected GitHub response: {e}"))
        } else {
            PublishError::transient(repo_name, format!("GitHub response interrupted: {e}"))
        }
    })
}

async fn ensure_success(repo_name: &str, response: Response) -> Result<Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<GitHubError>(&error_text)
        .map(|error| error.message)
        .unwrap_or(error_text);
    let message = format!("GitHub API error ({status}): {detail}");

    match status.as_u16() {
        401 | 403 | 429 | 500..=599 => Err(PublishError::transient(repo_name, message)),
        _ => Err(PublishError::permanent(repo_name, message)),
    }
}
