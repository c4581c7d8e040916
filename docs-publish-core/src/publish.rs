//! Idempotent publish: make sure a branch exists and a file on it holds the given content.
//!
//! The routine is strictly sequential. Every hosting call is awaited before the next is
//! issued, and the only condition it recovers from is [`HostingError::NotFound`]:
//!
//! 1. **Ensure branch.** Read `refs/heads/{branch}`. When it is missing, either
//!    - build a parentless commit whose tree holds only the file and point the new branch
//!      at it (orphan mode, which also completes the run), or
//!    - branch off the head of [`DEFAULT_BASE_BRANCH`].
//! 2. **Ensure file.** Read the file to capture its revision token, then issue one
//!    create-or-update write carrying that token (or none, to create the file).
//!
//! Content is never compared before writing, and a branch created in step 1 is not
//! rolled back when step 2 fails.

use thiserror::Error;
use tracing::{error, info};

use crate::contract::{FileBlob, FileWrite, HostingApi, HostingError, NewCommit, TreeEntry};
use crate::inputs::{normalize_output_path, ConfigError};

/// Branch new non-orphan branches start from.
pub const DEFAULT_BASE_BRANCH: &str = "main";

pub const ORPHAN_COMMIT_MESSAGE: &str = "Create orphan branch with a single file";
pub const UPDATE_COMMIT_MESSAGE: &str = "Updated auto-generated documentation";

/// Everything needed to publish one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Normalized: no leading `.` or `/`, no doubled separators.
    pub path: String,
    pub content: Vec<u8>,
    pub orphan: bool,
}

impl PublishRequest {
    /// Build a request, normalizing `path` and rejecting an empty branch or path.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        path: &str,
        content: Vec<u8>,
        orphan: bool,
    ) -> Result<Self, ConfigError> {
        let branch = branch.into();
        if branch.trim().is_empty() {
            return Err(ConfigError::MissingInput("branch"));
        }
        let path = normalize_output_path(path);
        if path.is_empty() {
            return Err(ConfigError::MissingInput("output"));
        }
        Ok(Self {
            owner: owner.into(),
            repo: repo.into(),
            branch,
            path,
            content,
            orphan,
        })
    }
}

/// Which path the publisher took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The branch was missing and was created as a single parentless commit holding the file.
    OrphanBranchCreated { commit_sha: String },
    /// The file did not exist and was created.
    FileCreated { branch_created: bool },
    /// The file existed and was replaced.
    FileUpdated { branch_created: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub branch: String,
    pub path: String,
    pub outcome: PublishOutcome,
    /// Revision token of the file after the write, when the host reported one.
    pub revision_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to {op} \"{target}\": {source}")]
    Hosting {
        op: &'static str,
        target: String,
        #[source]
        source: HostingError,
    },
}

impl PublishError {
    fn hosting(op: &'static str, target: &str, source: HostingError) -> Self {
        PublishError::Hosting {
            op,
            target: target.to_string(),
            source,
        }
    }

    /// The underlying hosting error.
    pub fn hosting_error(&self) -> &HostingError {
        match self {
            PublishError::Hosting { source, .. } => source,
        }
    }
}

pub async fn publish<H>(api: &H, request: &PublishRequest) -> Result<PublishReport, PublishError>
where
    H: HostingApi + ?Sized,
{
    info!(
        owner = %request.owner,
        repo = %request.repo,
        branch = %request.branch,
        path = %request.path,
        orphan = request.orphan,
        "[PUBLISH] Uploading the generated documentation"
    );

    // Step 1: ensure branch.
    let branch_created = match api.get_ref(&request.branch).await {
        Ok(existing) => {
            info!(branch = %existing.name, head = %existing.head_commit_sha, "[PUBLISH] Branch exists");
            false
        }
        Err(HostingError::NotFound(_)) if request.orphan => {
            let commit_sha = create_orphan_branch(api, request).await?;
            return Ok(PublishReport {
                branch: request.branch.clone(),
                path: request.path.clone(),
                outcome: PublishOutcome::OrphanBranchCreated { commit_sha },
                revision_id: None,
            });
        }
        Err(HostingError::NotFound(_)) => {
            create_branch(api, request).await?;
            true
        }
        Err(e) => {
            error!(branch = %request.branch, error = %e, "[PUBLISH][ERROR] Failed to read branch");
            return Err(PublishError::hosting("read branch", &request.branch, e));
        }
    };

    // Step 2: ensure file.
    let prior_revision_id = match api.get_file(&request.path, &request.branch).await {
        Ok(existing) => {
            info!(path = %request.path, revision = ?existing.prior_revision_id, "[PUBLISH] File exists, updating");
            existing.prior_revision_id
        }
        Err(HostingError::NotFound(_)) => {
            info!(path = %request.path, "[PUBLISH] File does not exist, creating");
            None
        }
        Err(e) => {
            error!(path = %request.path, error = %e, "[PUBLISH][ERROR] Failed to read file");
            return Err(PublishError::hosting("read repository path", &request.path, e));
        }
    };

    let updating = prior_revision_id.is_some();
    let write = FileWrite {
        branch: request.branch.clone(),
        message: UPDATE_COMMIT_MESSAGE.to_string(),
        blob: FileBlob::new(&request.path, &request.content, prior_revision_id),
    };
    let stored = api.put_file(write).await.map_err(|e| {
        error!(path = %request.path, error = %e, "[PUBLISH][ERROR] Failed to update repository path");
        PublishError::hosting("update repository path", &request.path, e)
    })?;

    info!(
        branch = %request.branch,
        path = %request.path,
        revision = ?stored.prior_revision_id,
        "[PUBLISH] File written"
    );

    let outcome = if updating {
        PublishOutcome::FileUpdated { branch_created }
    } else {
        PublishOutcome::FileCreated { branch_created }
    };
    Ok(PublishReport {
        branch: request.branch.clone(),
        path: request.path.clone(),
        outcome,
        revision_id: stored.prior_revision_id,
    })
}

/// Branch off the head of [`DEFAULT_BASE_BRANCH`].
async fn create_branch<H>(api: &H, request: &PublishRequest) -> Result<(), PublishError>
where
    H: HostingApi + ?Sized,
{
    info!(branch = %request.branch, base = DEFAULT_BASE_BRANCH, "[PUBLISH] Creating branch");

    let head = api
        .get_branch_head(DEFAULT_BASE_BRANCH)
        .await
        .map_err(|e| {
            error!(base = DEFAULT_BASE_BRANCH, error = %e, "[PUBLISH][ERROR] Failed to read base branch head");
            PublishError::hosting("read head of branch", DEFAULT_BASE_BRANCH, e)
        })?;

    api.create_ref(&request.branch, &head.sha).await.map_err(|e| {
        error!(branch = %request.branch, error = %e, "[PUBLISH][ERROR] Failed to create branch");
        PublishError::hosting("create branch", &request.branch, e)
    })?;
    Ok(())
}

/// Create a single parentless commit holding only the file, and point the new branch at it.
async fn create_orphan_branch<H>(api: &H, request: &PublishRequest) -> Result<String, PublishError>
where
    H: HostingApi + ?Sized,
{
    info!(branch = %request.branch, path = %request.path, "[PUBLISH] Creating orphan branch");

    let tree = api
        .create_tree(vec![TreeEntry::blob(&request.path, &request.content)])
        .await
        .map_err(|e| {
            error!(path = %request.path, error = %e, "[PUBLISH][ERROR] Failed to create tree");
            PublishError::hosting("create tree for", &request.path, e)
        })?;

    let commit = api
        .create_commit(NewCommit {
            message: ORPHAN_COMMIT_MESSAGE.to_string(),
            tree_sha: tree.sha,
            parents: Vec::new(),
        })
        .await
        .map_err(|e| {
            error!(branch = %request.branch, error = %e, "[PUBLISH][ERROR] Failed to create orphan commit");
            PublishError::hosting("create orphan commit on", &request.branch, e)
        })?;

    api.create_ref(&request.branch, &commit.sha)
        .await
        .map_err(|e| {
            error!(branch = %request.branch, error = %e, "[PUBLISH][ERROR] Failed to create orphan branch");
            PublishError::hosting("create branch", &request.branch, e)
        })?;

    info!(branch = %request.branch, commit = %commit.sha, "[PUBLISH] Orphan branch created");
    Ok(commit.sha)
}
