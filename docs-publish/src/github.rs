#![doc = "GitHub integration: implements the core hosting contract against the GitHub REST API."]
//
//! # GitHub client
//!
//! Wires [`HostingApi`] from `docs-publish-core` to the GitHub REST v3 endpoints the
//! publisher needs:
//!
//! | Operation         | Request                                          |
//! |-------------------|--------------------------------------------------|
//! | `get_ref`         | `GET  /repos/{o}/{r}/git/ref/heads/{branch}`     |
//! | `get_branch_head` | `GET  /repos/{o}/{r}/git/ref/heads/{branch}`     |
//! | `create_ref`      | `POST /repos/{o}/{r}/git/refs`                   |
//! | `create_tree`     | `POST /repos/{o}/{r}/git/blobs` + `git/trees`    |
//! | `create_commit`   | `POST /repos/{o}/{r}/git/commits`                |
//! | `get_file`        | `GET  /repos/{o}/{r}/contents/{path}?ref=...`    |
//! | `put_file`        | `PUT  /repos/{o}/{r}/contents/{path}`            |
//!
//! Status codes are folded into the closed [`HostingError`] classification here, so the
//! publisher only ever branches on [`HostingError::NotFound`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use docs_publish_core::contract::{
    BranchRef, CommitRef, FileBlob, FileWrite, HostingApi, HostingError, NewCommit, TreeEntry,
    TreeRef,
};
use docs_publish_core::inputs::ActionSettings;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "docs-publish";

pub struct GitHubClient {
    client: Client,
    token: String,
    owner: String,
    repo: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubClient {
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self::with_api_base(token, owner, repo, DEFAULT_API_BASE)
    }

    /// Use a custom API base URL (e.g. `https://github.example.com/api/v3`).
    pub fn with_api_base(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        let api_base: String = api_base.into();
        Self {
            client: Client::new(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &ActionSettings) -> Self {
        let client = Self::with_api_base(
            &settings.github_token,
            &settings.owner,
            &settings.repo,
            settings
                .github_api_url
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE),
        );
        tracing::info!(
            owner = %client.owner,
            repo = %client.repo,
            api_base = %client.api_base,
            "Initialized GitHubClient from settings"
        );
        client
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn headers(&self) -> Result<HeaderMap, HostingError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token)).map_err(|_| {
            HostingError::Unauthorized("token contains characters not allowed in a header".into())
        })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Repository endpoint URL with each of `segments` escaped.
    fn escaped_repo_url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, HostingError> {
        let mut url = Url::parse(&format!(
            "{}/repos/{}/{}",
            self.api_base, self.owner, self.repo
        ))
        .map_err(|e| HostingError::Network(format!("invalid API URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| HostingError::Network("API URL cannot be a base".into()))?
            .extend(segments);
        Ok(url)
    }

    /// URL of a file in the contents API.
    fn contents_url(&self, path: &str) -> Result<Url, HostingError> {
        self.escaped_repo_url(std::iter::once("contents").chain(path.split('/')))
    }

    /// URL of `refs/heads/{branch}`. Branch names may contain `#` or `%`.
    fn ref_url(&self, branch: &str) -> Result<Url, HostingError> {
        self.escaped_repo_url(["git", "ref", "heads"].into_iter().chain(branch.split('/')))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, HostingError> {
        let response = request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| HostingError::Network(e.to_string()))?;
        handle_response(response).await
    }

    async fn read_ref(&self, branch: &str) -> Result<GitRefResponse, HostingError> {
        let url = self.ref_url(branch)?;
        tracing::debug!(%url, "GET ref");
        self.send(self.client.get(url)).await
    }

    async fn create_blob(&self, base64_content: &str) -> Result<String, HostingError> {
        let url = self.repo_url("git/blobs");
        let body = CreateBlobBody {
            content: base64_content,
            encoding: "base64",
        };
        let blob: ShaResponse = self.send(self.client.post(&url).json(&body)).await?;
        Ok(blob.sha)
    }
}

/// Handle API response, mapping errors appropriately.
async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, HostingError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| HostingError::Decode(e.to_string()));
    }

    let rate_limit_exhausted = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "0")
        .unwrap_or(false);

    let message = match response.json::<GitHubErrorResponse>().await {
        Ok(err) => err.message,
        Err(_) => "Unknown error".to_string(),
    };

    tracing::debug!(status = status.as_u16(), %message, "GitHub API returned an error");

    Err(match status {
        StatusCode::NOT_FOUND => HostingError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => HostingError::RateLimited,
        StatusCode::FORBIDDEN if rate_limit_exhausted => HostingError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HostingError::Unauthorized(message),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => HostingError::Rejected {
            status: status.as_u16(),
            message,
        },
        _ if status.is_server_error() => HostingError::Api {
            status: status.as_u16(),
            message: format!("GitHub server error: {}", message),
        },
        _ => HostingError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn get_ref(&self, branch: &str) -> Result<BranchRef, HostingError> {
        let found = self.read_ref(branch).await?;
        Ok(BranchRef {
            name: branch.to_string(),
            head_commit_sha: found.object.sha,
        })
    }

    async fn create_ref(&self, branch: &str, sha: &str) -> Result<BranchRef, HostingError> {
        let url = self.repo_url("git/refs");
        let full_ref = format!("refs/heads/{branch}");
        tracing::info!(branch, sha, "Creating ref");
        let body = CreateRefBody {
            git_ref: &full_ref,
            sha,
        };
        let created: GitRefResponse = self.send(self.client.post(&url).json(&body)).await?;
        Ok(BranchRef {
            name: branch.to_string(),
            head_commit_sha: created.object.sha,
        })
    }

    async fn get_branch_head(&self, branch: &str) -> Result<CommitRef, HostingError> {
        let found = self.read_ref(branch).await?;
        Ok(CommitRef {
            sha: found.object.sha,
        })
    }

    async fn create_tree(&self, entries: Vec<TreeEntry>) -> Result<TreeRef, HostingError> {
        // Blobs go up as base64 so binary and text content survive unchanged.
        let mut items = Vec::with_capacity(entries.len());
        for entry in &entries {
            let sha = self.create_blob(&entry.base64_content).await?;
            items.push(TreeItem {
                path: &entry.path,
                mode: &entry.mode,
                kind: "blob",
                sha,
            });
        }

        let url = self.repo_url("git/trees");
        tracing::info!(entries = items.len(), "Creating tree");
        let tree: ShaResponse = self
            .send(self.client.post(&url).json(&CreateTreeBody { tree: items }))
            .await?;
        Ok(TreeRef { sha: tree.sha })
    }

    async fn create_commit(&self, commit: NewCommit) -> Result<CommitRef, HostingError> {
        let url = self.repo_url("git/commits");
        tracing::info!(tree = %commit.tree_sha, parents = commit.parents.len(), "Creating commit");
        let body = CreateCommitBody {
            message: &commit.message,
            tree: &commit.tree_sha,
            parents: &commit.parents,
        };
        let created: ShaResponse = self.send(self.client.post(&url).json(&body)).await?;
        Ok(CommitRef { sha: created.sha })
    }

    async fn get_file(&self, path: &str, branch: &str) -> Result<FileBlob, HostingError> {
        let url = self.contents_url(path)?;
        tracing::debug!(%url, branch, "GET contents");
        let found: ContentResponse = self
            .send(self.client.get(url).query(&[("ref", branch)]))
            .await?;
        Ok(FileBlob {
            path: found.path,
            prior_revision_id: Some(found.sha),
            base64_content: found.content,
        })
    }

    async fn put_file(&self, write: FileWrite) -> Result<FileBlob, HostingError> {
        let url = self.contents_url(&write.blob.path)?;
        tracing::info!(
            path = %write.blob.path,
            branch = %write.branch,
            update = write.blob.prior_revision_id.is_some(),
            "PUT contents"
        );
        let body = PutContentBody {
            message: &write.message,
            content: &write.blob.base64_content,
            sha: write.blob.prior_revision_id.as_deref(),
            branch: &write.branch,
        };
        let stored: PutContentResponse = self.send(self.client.put(url).json(&body)).await?;
        Ok(FileBlob {
            path: stored.content.path,
            prior_revision_id: Some(stored.content.sha),
            base64_content: write.blob.base64_content,
        })
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GitRefResponse {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ShaResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct PutContentResponse {
    content: StoredContent,
}

#[derive(Debug, Deserialize)]
struct StoredContent {
    path: String,
    sha: String,
}

#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    sha: &'a str,
}

#[derive(Serialize)]
struct CreateBlobBody<'a> {
    content: &'a str,
    encoding: &'a str,
}

#[derive(Serialize)]
struct TreeItem<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    sha: String,
}

#[derive(Serialize)]
struct CreateTreeBody<'a> {
    tree: Vec<TreeItem<'a>>,
}

#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: &'a [String],
}

#[derive(Serialize)]
struct PutContentBody<'a> {
    message: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}
